//! Voting Engine
//!
//! Maps the three chat command shapes (`start`, `end`, `<id> <code>`) to
//! poll store operations and renders replies. Vote confirmations never echo
//! the chosen option back into the room, and tallies are aggregate-only.

use std::sync::Arc;

use crate::channels::{split_args, CommandRequest, CommandSpec, ReplyContext};
use crate::config::PollServiceConfig;
use crate::polls::store::{PollError, PollStore, Tally};

/// Chat-facing poll command handler
pub struct PollCommand {
    store: Arc<PollStore>,
    /// Base URL of the code issuer, quoted in start replies
    code_endpoint: String,
}

impl PollCommand {
    /// Create a handler backed by the given store
    pub fn new(store: Arc<PollStore>, config: &PollServiceConfig) -> Self {
        Self {
            store,
            code_endpoint: config.code_endpoint(),
        }
    }

    /// Registration metadata for the transport's command dispatcher
    pub fn spec() -> CommandSpec {
        CommandSpec {
            name: "poll",
            aliases: vec![],
            help: concat!(
                "Start, participate and get results of a poll.\n",
                "%poll start <option1> <option2> ...\n",
                "Starts a new poll. Use space as the separator of options, ",
                "quote options containing spaces with \" or '. ",
                "If there is only one option specified, a 'not <option>' ",
                "option will be added automatically.\n",
                "%poll end <id>\n",
                "Ends the poll with id <id> and prints the result. ",
                "Only the creator of a poll can end it.\n",
                "%poll <id> <code>\n",
                "Vote in a poll. You can vote only once during a poll and ",
                "can not change your answer. In order to obtain a vote code ",
                "you have to send a GET request to a certain endpoint. ",
                "Ask a room moderator for details.\n",
            )
            .to_string(),
        }
    }

    /// Handle one incoming command invocation.
    ///
    /// Every expected failure is answered in the same turn without mutating
    /// state; reply-delivery failures are logged, never surfaced to chat.
    pub async fn handle(&self, request: &CommandRequest, ctx: &dyn ReplyContext) {
        if request.args.len() < 2 {
            self.send(ctx, "See %help poll").await;
            return;
        }
        match request.args[0].as_str() {
            "start" => self.handle_start(request, ctx).await,
            "end" => self.handle_end(request, ctx).await,
            _ => self.handle_vote(request, ctx).await,
        }
    }

    async fn handle_start(&self, request: &CommandRequest, ctx: &dyn ReplyContext) {
        let raw = request.args[1..].join(" ");
        let options = match split_args(&raw) {
            Ok(options) if !options.is_empty() => options,
            Ok(_) => {
                self.send(ctx, "See %help poll").await;
                return;
            }
            Err(err) => {
                self.send(ctx, &format!("{err}. See %help poll")).await;
                return;
            }
        };
        match self.store.create(&request.sender, options) {
            Ok(id) => {
                self.send_formatted(
                    ctx,
                    &format!(
                        "Poll <strong>{id}</strong> has been started. \
                         Voting codes are issued at {endpoint}/{id}/&lt;option&gt;.",
                        endpoint = self.code_endpoint,
                    ),
                )
                .await;
            }
            Err(PollError::CapacityExceeded) => {
                self.send(
                    ctx,
                    "The maximum amount of started polls is exceeded. \
                     Wait until some of them eventually time out.",
                )
                .await;
            }
            Err(PollError::InvalidOption { option }) if option.trim().is_empty() => {
                self.send(ctx, "Options can not be empty. See %help poll")
                    .await;
            }
            Err(PollError::InvalidOption { option }) => {
                self.send(ctx, &format!("Duplicate option: {option}. See %help poll"))
                    .await;
            }
            Err(err) => self.internal_error(ctx, "start", err).await,
        }
    }

    async fn handle_end(&self, request: &CommandRequest, ctx: &dyn ReplyContext) {
        let id = request.args[1].as_str();
        match self.store.end(id, &request.sender) {
            Ok(tally) => {
                self.send_formatted(ctx, &render_result(id, &tally)).await;
            }
            Err(PollError::NotFound { .. }) => {
                self.send_formatted(
                    ctx,
                    &format!("A poll with id <strong>{id}</strong> does not exist."),
                )
                .await;
            }
            Err(PollError::NotCreator) => {
                self.send(
                    ctx,
                    "You have to be the creator of this poll in order to end it.",
                )
                .await;
            }
            Err(err) => self.internal_error(ctx, "end", err).await,
        }
    }

    async fn handle_vote(&self, request: &CommandRequest, ctx: &dyn ReplyContext) {
        let id = request.args[0].as_str();
        let code = request.args[1].as_str();
        match self.store.vote(id, code, &request.sender) {
            // deliberately generic: the chosen option stays private
            Ok(_) => {
                self.send(
                    ctx,
                    "Voted successfully. Now wait until the creator \
                     of this poll ends it to find out the result.",
                )
                .await;
            }
            Err(PollError::NotFound { .. }) => {
                self.send_formatted(
                    ctx,
                    &format!("A poll with id <strong>{id}</strong> does not exist."),
                )
                .await;
            }
            Err(PollError::InvalidCode) => {
                self.send(ctx, "Wrong code.").await;
            }
            Err(PollError::AlreadyVoted) => {
                self.send(ctx, "You are not allowed to vote twice in the same poll.")
                    .await;
            }
            Err(err) => self.internal_error(ctx, "vote", err).await,
        }
    }

    async fn send(&self, ctx: &dyn ReplyContext, text: &str) {
        if let Err(err) = ctx.reply(text).await {
            tracing::error!(error = %err, "failed to send poll reply");
        }
    }

    async fn send_formatted(&self, ctx: &dyn ReplyContext, html: &str) {
        if let Err(err) = ctx.reply_formatted(html).await {
            tracing::error!(error = %err, "failed to send poll reply");
        }
    }

    async fn internal_error(&self, ctx: &dyn ReplyContext, op: &str, err: PollError) {
        tracing::error!(operation = op, error = %err, "unexpected poll failure");
        self.send(ctx, "Something went wrong, try again later.").await;
    }
}

/// Render an ended poll's tally as a chat message
fn render_result(id: &str, tally: &Tally) -> String {
    let mut out = format!("Poll <strong>{id}</strong> has been ended.");
    if tally.total_votes == 0 {
        out.push_str(" No one voted though :(");
        return out;
    }
    out.push_str(" Here is the result:\n");
    for entry in &tally.distribution {
        out.push_str(&format!(
            "{}: <strong>{}</strong> ({} {})\n",
            entry.option,
            entry.percentage,
            entry.votes,
            if entry.votes == 1 { "vote" } else { "votes" },
        ));
    }
    out
}
