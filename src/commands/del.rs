use crate::commands::executable::Executable;
use crate::commands::{parse_key, CommandError};
use crate::message::Message;
use crate::store::Store;

/// Removes the specified keys, returning how many of them existed.
///
/// Ref: <https://redis.io/docs/latest/commands/del>
#[derive(Debug, PartialEq)]
pub struct Del;

impl Executable for Del {
    fn name(&self) -> &'static str {
        "DEL"
    }

    fn validate(&self, args: &[Message]) -> Result<(), CommandError> {
        if args.is_empty() {
            return Err(CommandError::WrongArity("del"));
        }
        Ok(())
    }

    fn exec(&self, args: &[Message], store: &dyn Store) -> Result<Message, CommandError> {
        let keys = args.iter().map(parse_key).collect::<Result<Vec<_>, _>>()?;

        let count = keys.iter().filter(|key| store.delete(key)).count();

        Ok(Message::integer(count as i64))
    }
}
