pub mod factories;
pub mod factory;
pub mod flaky_gateway;
pub mod seeded;
