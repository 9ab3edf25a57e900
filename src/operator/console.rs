use super::{MenuChoice, Operation};
use crate::error::InputError;
use crate::flight_control::FlightState;
use std::io::Write;
use strum::IntoEnumIterator;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines, Stdin};

const RULE: &str = "============================================================";

/// Line based operator front-end on top of an async reader, stdin by default.
pub struct OperatorConsole<R = Stdin> {
    lines: Lines<BufReader<R>>,
}

impl OperatorConsole<Stdin> {
    pub fn stdin() -> Self { Self::new(tokio::io::stdin()) }
}

impl<R: AsyncRead + Unpin> OperatorConsole<R> {
    pub fn new(reader: R) -> Self { Self { lines: BufReader::new(reader).lines() } }

    pub fn print_menu(state: FlightState) {
        println!("\n{RULE}");
        println!("\x1b[1;95m CHAOS ENGINEER: COMMANDER \x1b[0m (vehicle {state})");
        println!("{RULE}");
        for choice in MenuChoice::iter() {
            println!("{}. {choice}", choice.number());
        }
    }

    async fn prompt(&mut self, text: &str) -> Option<String> {
        print!("\x1b[1m{text}:\x1b[0m ");
        let _ = std::io::stdout().flush();
        self.lines.next_line().await.ok().flatten()
    }

    /// Asks for a menu selection and any arguments it needs.
    ///
    /// # Returns
    /// `None` once the input is exhausted, otherwise the parsed operation or the reason
    /// the input was rejected.
    pub async fn read_operation(&mut self) -> Option<Result<Operation, InputError>> {
        let selection = self.prompt("\nSelect Mission").await?;
        let choice = match MenuChoice::from_selection(&selection) {
            Ok(choice) => choice,
            Err(e) => return Some(Err(e)),
        };
        let mut answers = Vec::with_capacity(choice.prompts().len());
        for text in choice.prompts() {
            answers.push(self.prompt(text).await?);
        }
        Some(choice.into_operation(&answers))
    }
}

#[cfg(test)]
mod tests {
    use super::OperatorConsole;
    use crate::error::InputError;
    use crate::flight_control::Direction;
    use crate::operator::Operation;

    #[tokio::test]
    async fn test_reads_operations_until_eof() {
        let input: &[u8] = b"1\n6\nu\n5\n7\n-35.363261\n149.165230\nabc\n12\n9\n";
        let mut console = OperatorConsole::new(input);
        assert_eq!(console.read_operation().await, Some(Ok(Operation::Launch)));
        assert_eq!(
            console.read_operation().await,
            Some(Ok(Operation::ManualMove { direction: Direction::Up, distance: 5.0 }))
        );
        assert_eq!(
            console.read_operation().await,
            Some(Err(InputError::NotANumber("abc".to_string())))
        );
        assert_eq!(
            console.read_operation().await,
            Some(Err(InputError::UnknownSelection("12".to_string())))
        );
        assert_eq!(console.read_operation().await, Some(Ok(Operation::Exit)));
        assert_eq!(console.read_operation().await, None);
    }

    #[tokio::test]
    async fn test_eof_inside_prompts() {
        let input: &[u8] = b"7\n-35.0\n";
        let mut console = OperatorConsole::new(input);
        assert_eq!(console.read_operation().await, None);
    }
}
