use crate::commands::executable::Executable;
use crate::commands::{parse_key, CommandError};
use crate::message::Message;
use crate::store::Store;

/// Returns how many of the given keys exist. A key mentioned twice is counted twice.
///
/// Ref: <https://redis.io/docs/latest/commands/exists>
#[derive(Debug, PartialEq)]
pub struct Exists;

impl Executable for Exists {
    fn name(&self) -> &'static str {
        "EXISTS"
    }

    fn validate(&self, args: &[Message]) -> Result<(), CommandError> {
        if args.is_empty() {
            return Err(CommandError::WrongArity("exists"));
        }
        Ok(())
    }

    fn exec(&self, args: &[Message], store: &dyn Store) -> Result<Message, CommandError> {
        let mut count = 0;
        for arg in args {
            if store.exists(&parse_key(arg)?) {
                count += 1;
            }
        }

        Ok(Message::integer(count))
    }
}
