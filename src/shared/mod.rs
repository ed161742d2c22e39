//! Small building blocks shared by the menu, the reaction strip, and the status banner.

pub mod cancellation;
pub mod geometry;
pub mod listeners;
pub mod lookup;
pub mod visibility;
