pub mod dbsize;
pub mod del;
pub mod echo;
pub mod executable;
pub mod exists;
pub mod flushdb;
pub mod get;
pub mod ping;
pub mod set;

use bytes::Bytes;
use std::collections::HashMap;
use std::str;
use thiserror::Error as ThisError;
use tracing::debug;

use crate::commands::executable::Executable;
use crate::message::Message;
use crate::store::{Store, StoreError};

use dbsize::DBSize;
use del::Del;
use echo::Echo;
use exists::Exists;
use flushdb::FlushDB;
use get::Get;
use ping::Ping;
use set::Set;

/// Failures a command reports back to the client. They never close the connection.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum CommandError {
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),
    #[error("invalid argument type for {0}")]
    InvalidArgumentType(&'static str),
    #[error("key cannot be null")]
    NullKey,
    #[error("invalid key type")]
    InvalidKeyType,
    #[error("invalid value type")]
    InvalidValueType,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A request whose shape is not `[command-name, args...]`.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum RequestError {
    #[error("Protocol error: expected array")]
    ExpectedArray,
    #[error("Protocol error: null array")]
    NullArray,
    #[error("Protocol error: empty array")]
    EmptyArray,
    #[error("Protocol error: command name must be a string")]
    InvalidCommandName,
    #[error("Protocol error: null command name")]
    NullCommandName,
}

impl RequestError {
    pub fn into_message(self) -> Message {
        Message::error(format!("ERR {}", self))
    }
}

/// A client request: the upper-cased command name and its arguments.
#[derive(Debug, PartialEq)]
pub struct Request {
    pub name: String,
    pub args: Vec<Message>,
}

impl TryFrom<Message> for Request {
    type Error = RequestError;

    fn try_from(message: Message) -> Result<Self, Self::Error> {
        // Clients send commands to the Redis server as RESP arrays.
        let mut parts = match message {
            Message::Array(Some(parts)) => parts.into_iter(),
            Message::Array(None) => return Err(RequestError::NullArray),
            _ => return Err(RequestError::ExpectedArray),
        };

        let name = match parts.next() {
            Some(Message::Simple(name)) => name,
            Some(Message::Bulk(Some(name))) => String::from_utf8_lossy(&name).into_owned(),
            Some(Message::Bulk(None)) => return Err(RequestError::NullCommandName),
            Some(_) => return Err(RequestError::InvalidCommandName),
            None => return Err(RequestError::EmptyArray),
        };

        // Command names are case-insensitive.
        Ok(Request {
            name: name.to_uppercase(),
            args: parts.collect(),
        })
    }
}

/// Maps command names to their handlers.
///
/// Built once per server before it starts accepting connections and read-only afterwards, so it
/// can be shared without locking.
#[derive(Default)]
pub struct Registry {
    commands: HashMap<&'static str, Box<dyn Executable>>,
}

impl Registry {
    pub fn new() -> Registry {
        Self::default()
    }

    /// A registry holding every command this crate implements.
    pub fn with_builtins() -> Registry {
        let mut registry = Registry::new();
        registry.register(Box::new(Ping));
        registry.register(Box::new(Echo));
        registry.register(Box::new(Get));
        registry.register(Box::new(Set));
        registry.register(Box::new(Del));
        registry.register(Box::new(Exists));
        registry.register(Box::new(DBSize));
        registry.register(Box::new(FlushDB));
        registry
    }

    /// Registers `command` under its own name, replacing any handler already registered under
    /// that name.
    pub fn register(&mut self, command: Box<dyn Executable>) {
        self.commands.insert(command.name(), command);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Executable> {
        self.commands.get(name).map(|command| command.as_ref())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    /// Turns a request message into its reply. Malformed requests never reach a handler.
    pub fn handle(&self, message: Message, store: &dyn Store) -> Message {
        match Request::try_from(message) {
            Ok(request) => self.dispatch(&request.name, &request.args, store),
            Err(err) => err.into_message(),
        }
    }

    /// Looks up, validates and executes a command. `name` must already be upper-cased.
    ///
    /// Unknown commands and command failures are turned into error replies, the way Redis
    /// reports user errors without dropping the connection.
    pub fn dispatch(&self, name: &str, args: &[Message], store: &dyn Store) -> Message {
        let command = match self.get(name) {
            Some(command) => command,
            None => {
                debug!(command = name, "unknown command");
                return Message::error(format!("ERR unknown command '{}'", name));
            }
        };

        let result = command
            .validate(args)
            .and_then(|_| command.exec(args, store));

        match result {
            Ok(reply) => reply,
            Err(err) => {
                debug!(command = name, error = %err, "command failed");
                Message::error(format!("ERR {}", err))
            }
        }
    }
}

/// Extracts a key. Keys are simple strings or non-null, UTF-8 bulk strings.
pub(crate) fn parse_key(arg: &Message) -> Result<String, CommandError> {
    match arg {
        Message::Simple(key) => Ok(key.clone()),
        Message::Bulk(Some(key)) => str::from_utf8(key)
            .map(|key| key.to_string())
            .map_err(|_| CommandError::InvalidKeyType),
        Message::Bulk(None) => Err(CommandError::NullKey),
        _ => Err(CommandError::InvalidKeyType),
    }
}

/// Extracts a value to store. A null bulk string is stored as the empty string and integers as
/// their decimal text.
pub(crate) fn parse_value(arg: &Message) -> Result<Bytes, CommandError> {
    match arg {
        Message::Bulk(Some(value)) => Ok(value.clone()),
        Message::Bulk(None) => Ok(Bytes::new()),
        Message::Simple(value) => Ok(Bytes::from(value.clone())),
        Message::Integer(value) => Ok(Bytes::from(value.to_string())),
        _ => Err(CommandError::InvalidValueType),
    }
}
