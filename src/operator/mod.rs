mod commander;
mod console;
mod operation;

pub use commander::{Commander, ConsoleSignal};
pub use console::OperatorConsole;
pub use operation::{MenuChoice, Operation};
