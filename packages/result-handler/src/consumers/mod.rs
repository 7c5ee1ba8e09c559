pub mod judger_result;

pub use judger_result::consume_judger_results;
