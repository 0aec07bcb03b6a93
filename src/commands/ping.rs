use crate::commands::executable::Executable;
use crate::commands::CommandError;
use crate::message::Message;
use crate::store::Store;

/// Returns PONG if no argument is provided, otherwise returns a copy of the argument.
///
/// Ref: <https://redis.io/docs/latest/commands/ping>
#[derive(Debug, PartialEq)]
pub struct Ping;

impl Executable for Ping {
    fn name(&self) -> &'static str {
        "PING"
    }

    fn validate(&self, args: &[Message]) -> Result<(), CommandError> {
        if args.len() > 1 {
            return Err(CommandError::WrongArity("ping"));
        }
        Ok(())
    }

    fn exec(&self, args: &[Message], _store: &dyn Store) -> Result<Message, CommandError> {
        match args.first() {
            None => Ok(Message::simple("PONG")),
            // The payload keeps its type, null bulk strings included.
            Some(payload @ (Message::Simple(_) | Message::Bulk(_))) => Ok(payload.clone()),
            Some(_) => Err(CommandError::InvalidArgumentType("PING")),
        }
    }
}
