pub mod cart;
pub mod config;
pub mod domain;
pub mod errors;
pub mod session;

pub use cart::{CartItem, LineStatus, ProductLookup, SessionCart, StoredLine};
pub use domain::order::{Order, OrderDraft, OrderId, OrderLine};
pub use domain::product::{Category, CategorySlug, Product, ProductId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use session::{Session, SessionId};
