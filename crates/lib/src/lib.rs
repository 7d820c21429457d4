//! Copydesk core library — templates, chat sessions, the generate-copy client, the client
//! directory and the local HTTP gateway, used by the CLI.

pub mod chat;
pub mod clients;
pub mod config;
pub mod conversation;
pub mod gateway;
pub mod llm;
pub mod scope;
pub mod session;
pub mod templates;
