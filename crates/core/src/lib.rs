pub mod charge;
pub mod item;
pub mod money;
pub mod window;

pub use charge::ChargeTarget;
pub use item::{AccountExport, ItemError, ItemId, LineItem, RawItem};
pub use money::{Money, MoneyParseError};
pub use window::{day_delta, DateWindow};
