use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::CommandError;
use crate::message::Message;
use crate::store::Store;

/// Returns `message` as a bulk string.
///
/// Ref: <https://redis.io/docs/latest/commands/echo>
#[derive(Debug, PartialEq)]
pub struct Echo;

impl Executable for Echo {
    fn name(&self) -> &'static str {
        "ECHO"
    }

    fn validate(&self, args: &[Message]) -> Result<(), CommandError> {
        if args.len() != 1 {
            return Err(CommandError::WrongArity("echo"));
        }
        Ok(())
    }

    fn exec(&self, args: &[Message], _store: &dyn Store) -> Result<Message, CommandError> {
        match &args[0] {
            Message::Bulk(payload) => Ok(Message::Bulk(payload.clone())),
            Message::Simple(payload) => Ok(Message::bulk(Bytes::from(payload.clone()))),
            Message::Integer(i) => Ok(Message::bulk(Bytes::from(i.to_string()))),
            _ => Err(CommandError::InvalidArgumentType("ECHO")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Registry;
    use crate::store::MemoryStore;

    fn echo(args: &[Message]) -> Message {
        Registry::with_builtins().dispatch("ECHO", args, &MemoryStore::new())
    }

    #[test]
    fn bulk_string() {
        assert_eq!(echo(&[Message::bulk("hello")]), Message::bulk("hello"));
        assert_eq!(echo(&[Message::null_bulk()]), Message::null_bulk());
    }

    #[test]
    fn normalizes_to_bulk_string() {
        assert_eq!(echo(&[Message::simple("hello")]), Message::bulk("hello"));
        assert_eq!(echo(&[Message::integer(-42)]), Message::bulk("-42"));
    }

    #[test]
    fn invalid_argument() {
        assert_eq!(
            echo(&[Message::array(vec![Message::bulk("a")])]),
            Message::error("ERR invalid argument type for ECHO")
        );
        assert_eq!(
            echo(&[Message::error("oops")]),
            Message::error("ERR invalid argument type for ECHO")
        );
    }

    #[test]
    fn arity() {
        let expected = Message::error("ERR wrong number of arguments for 'echo' command");

        assert_eq!(echo(&[]), expected);
        assert_eq!(echo(&[Message::bulk("a"), Message::bulk("b")]), expected);
    }
}
