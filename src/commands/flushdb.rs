use crate::commands::executable::Executable;
use crate::commands::CommandError;
use crate::message::Message;
use crate::store::Store;

/// Deletes every key.
///
/// Ref: <https://redis.io/docs/latest/commands/flushdb>
#[derive(Debug, PartialEq)]
pub struct FlushDB;

impl Executable for FlushDB {
    fn name(&self) -> &'static str {
        "FLUSHDB"
    }

    fn validate(&self, args: &[Message]) -> Result<(), CommandError> {
        if !args.is_empty() {
            return Err(CommandError::WrongArity("flushdb"));
        }
        Ok(())
    }

    fn exec(&self, _args: &[Message], store: &dyn Store) -> Result<Message, CommandError> {
        store.clear();
        Ok(Message::simple("OK"))
    }
}
