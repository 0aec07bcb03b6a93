use crate::commands::executable::Executable;
use crate::commands::CommandError;
use crate::message::Message;
use crate::store::Store;

/// Returns the number of keys in the store.
///
/// Ref: <https://redis.io/docs/latest/commands/dbsize>
#[derive(Debug, PartialEq)]
pub struct DBSize;

impl Executable for DBSize {
    fn name(&self) -> &'static str {
        "DBSIZE"
    }

    fn validate(&self, args: &[Message]) -> Result<(), CommandError> {
        if !args.is_empty() {
            return Err(CommandError::WrongArity("dbsize"));
        }
        Ok(())
    }

    fn exec(&self, _args: &[Message], store: &dyn Store) -> Result<Message, CommandError> {
        Ok(Message::integer(store.size() as i64))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::commands::Registry;
    use crate::store::MemoryStore;

    #[test]
    fn size() {
        let store = MemoryStore::new();
        let registry = Registry::with_builtins();

        assert_eq!(registry.dispatch("DBSIZE", &[], &store), Message::integer(0));

        store.set("a".to_string(), Bytes::from("1")).unwrap();
        store.set("b".to_string(), Bytes::from("2")).unwrap();

        assert_eq!(registry.dispatch("DBSIZE", &[], &store), Message::integer(2));
    }

    #[test]
    fn arguments_are_rejected() {
        let reply = Registry::with_builtins().dispatch(
            "DBSIZE",
            &[Message::bulk("a")],
            &MemoryStore::new(),
        );

        assert_eq!(
            reply,
            Message::error("ERR wrong number of arguments for 'dbsize' command")
        );
    }
}
