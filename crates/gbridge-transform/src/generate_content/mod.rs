pub mod openai_chat2gemini;
