//! CPU state management
//!
//! - `barriers` - memory and instruction barriers
//! - `cache` - L1 cache and MMU shutdown before the kernel jump
//! - `irq` - IRQ/FIQ masking through CPSR

pub mod barriers;
pub mod cache;
pub mod irq;
