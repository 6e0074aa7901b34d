// Plan, apply, refresh and destroy
pub mod declarative;

// Core commands
pub mod doctor;
pub mod kinds;
