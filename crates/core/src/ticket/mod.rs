//! Ticket drawing, composition and the per-user ticket collection.

mod composer;
mod store;
mod types;

pub use composer::{TicketComposer, TicketDraw, TicketViewDescriptor};
pub use store::TicketStore;
pub use types::{
    LuckyNumber, TemplatePalette, TicketMessage, TicketRecord, TicketTemplate, LUCKY_NUMBER_MAX,
    LUCKY_NUMBER_MIN,
};
