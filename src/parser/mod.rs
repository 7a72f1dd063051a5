use crate::prelude::*;

use enum_dispatch::enum_dispatch;

pub mod heuristic;
pub mod register_map;

pub use heuristic::HeuristicParser;
pub use register_map::RegisterMapParser;

/// Turns a raw device response into a Telemetry sample.
#[enum_dispatch]
pub trait Decode {
    fn decode(&self, data: &[u8], capture: &Capture) -> Result<Telemetry>;

    fn name(&self) -> &'static str;
}

#[enum_dispatch(Decode)]
#[derive(Clone, Debug)]
pub enum Parser {
    Heuristic(HeuristicParser),
    RegisterMap(RegisterMapParser),
}

impl Parser {
    pub fn new(use_register_map: bool, code_tables: CodeTables) -> Self {
        if use_register_map {
            Parser::RegisterMap(RegisterMapParser::new(code_tables))
        } else {
            Parser::Heuristic(HeuristicParser)
        }
    }

    /// Decode `data`, falling back to the heuristic parser if the selected one fails.
    pub fn parse(&self, data: &[u8], capture: &Capture) -> Telemetry {
        match self.decode(data, capture) {
            Ok(telemetry) => telemetry,
            Err(err) => {
                warn!(
                    "{} parser failed ({}), falling back to {}",
                    self.name(),
                    err,
                    HeuristicParser.name()
                );
                HeuristicParser.classify(data, capture)
            }
        }
    }
}
