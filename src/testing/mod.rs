mod scripted_content_service;

pub use scripted_content_service::ScriptedContentService;
