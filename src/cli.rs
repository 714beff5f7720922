use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "parley",
    version,
    about = "Bounded multi-agent conversations over a hosted LLM API"
)]
pub struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the chat endpoint
    Serve(ServeArgs),
    /// Send one query to a running chat endpoint
    Ask(AskArgs),
    /// Admin, Coder and Critic work on a coding task
    GroupChat(GroupChatArgs),
    /// Planner and writer produce a post on a topic
    Crew(CrewArgs),
    /// Fact checker answers a question with web search
    Research(ResearchArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Overrides PARLEY_PORT
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Args)]
pub struct AskArgs {
    pub query: String,

    #[arg(long, default_value = "")]
    pub system_prompt: String,

    #[arg(long, default_value = crate::config::DEFAULT_MODEL)]
    pub model: String,

    #[arg(long)]
    pub allow_search: bool,

    /// Overrides PARLEY_CHAT_URL
    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Debug, Args)]
pub struct GroupChatArgs {
    /// Opening message from the Admin
    #[arg(long)]
    pub task: Option<String>,

    /// Let the group-chat manager pick each speaker
    #[arg(long)]
    pub moderated: bool,

    #[arg(long, default_value_t = crate::scenarios::group_chat::MAX_TURNS)]
    pub max_turns: u32,
}

#[derive(Debug, Args)]
pub struct CrewArgs {
    #[arg(long, default_value = crate::scenarios::content_crew::DEFAULT_TOPIC)]
    pub topic: String,
}

#[derive(Debug, Args)]
pub struct ResearchArgs {
    /// Question to answer instead of the built-in one
    pub question: Option<String>,
}
