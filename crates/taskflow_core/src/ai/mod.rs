//! Generative-model helpers: subtask and description drafting, project
//! summaries, risk analysis, reply suggestions and a function-calling
//! assistant.

mod assistant;
mod client;
mod service;

pub use assistant::{AssistantAction, AssistantReply, function_declarations, resolve_task};
pub use client::{
    FunctionCall, FunctionDeclaration, GeminiClient, GenerateReply, GenerateRequest,
    TextGenerator,
};
pub use service::{AiService, Risk, RiskLevel, strip_code_fences};

#[cfg(test)]
pub(crate) use service::fake;
