//! Domain types for CandleLab

pub mod bar;
pub mod position;
pub mod trade;

pub use bar::{Bar, BarError, BarTable};
pub use position::{Position, PositionSide};
pub use trade::{TradeRecord, END_OF_DATA};
