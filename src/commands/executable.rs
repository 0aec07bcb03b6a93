use crate::commands::CommandError;
use crate::message::Message;
use crate::store::Store;

/// A command handler. Handlers are stateless, registered once and shared by every connection.
pub trait Executable: Send + Sync {
    /// The upper-case name the handler is registered under.
    fn name(&self) -> &'static str;

    /// Checks the shape of the arguments, typically their count, before execution.
    fn validate(&self, args: &[Message]) -> Result<(), CommandError>;

    fn exec(&self, args: &[Message], store: &dyn Store) -> Result<Message, CommandError>;
}
