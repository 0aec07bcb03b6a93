use crate::commands::executable::Executable;
use crate::commands::{parse_key, parse_value, CommandError};
use crate::message::Message;
use crate::store::Store;

/// Set `key` to hold `value`, overwriting any previous value.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set;

impl Executable for Set {
    fn name(&self) -> &'static str {
        "SET"
    }

    fn validate(&self, args: &[Message]) -> Result<(), CommandError> {
        if args.len() != 2 {
            return Err(CommandError::WrongArity("set"));
        }
        Ok(())
    }

    fn exec(&self, args: &[Message], store: &dyn Store) -> Result<Message, CommandError> {
        let key = parse_key(&args[0])?;
        let value = parse_value(&args[1])?;

        store.set(key, value)?;

        Ok(Message::simple("OK"))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::commands::Registry;
    use crate::store::{MemoryStore, StoreError};

    fn set(store: &dyn Store, args: &[Message]) -> Message {
        Registry::with_builtins().dispatch("SET", args, store)
    }

    #[test]
    fn stores_value() {
        let store = MemoryStore::new();

        let reply = set(&store, &[Message::bulk("foo"), Message::bulk("bar")]);

        assert_eq!(reply, Message::simple("OK"));
        assert_eq!(store.get("foo"), Some(Bytes::from("bar")));
    }

    #[test]
    fn overwrites() {
        let store = MemoryStore::new();

        set(&store, &[Message::bulk("k"), Message::bulk("v1")]);
        set(&store, &[Message::bulk("k"), Message::bulk("v2")]);

        assert_eq!(store.get("k"), Some(Bytes::from("v2")));
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn value_conversions() {
        let store = MemoryStore::new();

        set(&store, &[Message::simple("a"), Message::simple("simple")]);
        set(&store, &[Message::simple("b"), Message::integer(42)]);
        set(&store, &[Message::simple("c"), Message::null_bulk()]);

        assert_eq!(store.get("a"), Some(Bytes::from("simple")));
        assert_eq!(store.get("b"), Some(Bytes::from("42")));
        assert_eq!(store.get("c"), Some(Bytes::new()));
    }

    #[test]
    fn invalid_arguments() {
        let store = MemoryStore::new();

        assert_eq!(
            set(&store, &[Message::null_bulk(), Message::bulk("v")]),
            Message::error("ERR key cannot be null")
        );
        assert_eq!(
            set(&store, &[Message::integer(1), Message::bulk("v")]),
            Message::error("ERR invalid key type")
        );
        assert_eq!(
            set(&store, &[Message::bulk("k"), Message::array(vec![])]),
            Message::error("ERR invalid value type")
        );
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn arity() {
        let store = MemoryStore::new();
        let expected = Message::error("ERR wrong number of arguments for 'set' command");

        assert_eq!(set(&store, &[Message::bulk("k")]), expected);
        assert_eq!(
            set(
                &store,
                &[Message::bulk("k"), Message::bulk("v"), Message::bulk("x")]
            ),
            expected
        );
    }

    struct ReadOnly;

    impl Store for ReadOnly {
        fn set(&self, _key: String, _value: Bytes) -> Result<(), StoreError> {
            Err(StoreError::Rejected("store is read-only".to_string()))
        }

        fn get(&self, _key: &str) -> Option<Bytes> {
            None
        }

        fn delete(&self, _key: &str) -> bool {
            false
        }

        fn exists(&self, _key: &str) -> bool {
            false
        }

        fn size(&self) -> usize {
            0
        }

        fn clear(&self) {}
    }

    #[test]
    fn store_refusal() {
        let reply = set(&ReadOnly, &[Message::bulk("k"), Message::bulk("v")]);

        assert_eq!(reply, Message::error("ERR store is read-only"));
    }
}
