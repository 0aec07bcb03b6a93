use crate::commands::executable::Executable;
use crate::commands::{parse_key, CommandError};
use crate::message::Message;
use crate::store::Store;

/// Get the value of `key`. If the key does not exist the special value `nil` is returned.
///
/// Ref: <https://redis.io/docs/latest/commands/get/>
#[derive(Debug, PartialEq)]
pub struct Get;

impl Executable for Get {
    fn name(&self) -> &'static str {
        "GET"
    }

    fn validate(&self, args: &[Message]) -> Result<(), CommandError> {
        if args.len() != 1 {
            return Err(CommandError::WrongArity("get"));
        }
        Ok(())
    }

    fn exec(&self, args: &[Message], store: &dyn Store) -> Result<Message, CommandError> {
        let key = parse_key(&args[0])?;

        match store.get(&key) {
            Some(value) => Ok(Message::bulk(value)),
            None => Ok(Message::null_bulk()),
        }
    }
}
