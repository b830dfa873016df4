pub mod chunker;
pub mod fallback;
pub mod generation_client;
pub mod lease;
pub mod pipeline_orchestrator;
pub mod pipeline_run;
pub mod prompt_builder;
pub mod response_parser;
pub mod validator;
