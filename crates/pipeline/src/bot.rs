//! Activity dispatch on top of the turn pipeline.

use ragbridge_core::activity::{Activity, ActivityType};
use ragbridge_core::message::ConversationId;
use ragbridge_core::turn::{TurnRequest, TurnStatus};
use std::sync::Arc;
use tracing::{debug, info};

use crate::turn::TurnPipeline;

/// What the transport should send back for one inbound activity.
#[derive(Debug, Clone)]
pub enum ActivityOutcome {
    /// A reply activity was produced (answer or welcome).
    Replied(Activity),

    /// Nothing to say; acknowledge without a body.
    Ignored,

    /// Rejected before any work was done.
    Rejected(TurnStatus),

    /// The backend failed; the activity carries the apology text.
    Failed(Activity),
}

/// Routes activities: messages become turns keyed by the sender id, member
/// joins get the welcome text, everything else is acknowledged.
pub struct ActivityBot {
    pipeline: Arc<TurnPipeline>,
}

impl ActivityBot {
    pub fn new(pipeline: Arc<TurnPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<TurnPipeline> {
        &self.pipeline
    }

    pub async fn handle(&self, activity: &Activity, auth_header: Option<&str>) -> ActivityOutcome {
        match activity.activity_type {
            ActivityType::Message => self.on_message(activity, auth_header).await,
            ActivityType::ConversationUpdate => {
                self.on_conversation_update(activity, auth_header).await
            }
            other => {
                if !self.pipeline.authorize(auth_header).await {
                    return ActivityOutcome::Rejected(TurnStatus::Unauthorized);
                }
                debug!(activity_type = ?other, "Ignoring activity");
                ActivityOutcome::Ignored
            }
        }
    }

    async fn on_message(&self, activity: &Activity, auth_header: Option<&str>) -> ActivityOutcome {
        let conversation_id = ConversationId::or_anonymous(activity.sender_id());
        let request = TurnRequest::new(conversation_id, activity.text.clone().unwrap_or_default())
            .with_auth_header(auth_header.map(str::to_string));

        let result = self.pipeline.handle_turn(request).await;
        match result.status {
            TurnStatus::Ok => ActivityOutcome::Replied(activity.reply(result.reply_text)),
            TurnStatus::UpstreamError => ActivityOutcome::Failed(activity.reply(result.reply_text)),
            status => ActivityOutcome::Rejected(status),
        }
    }

    async fn on_conversation_update(
        &self,
        activity: &Activity,
        auth_header: Option<&str>,
    ) -> ActivityOutcome {
        if !self.pipeline.authorize(auth_header).await {
            return ActivityOutcome::Rejected(TurnStatus::Unauthorized);
        }

        let bot = self.pipeline.bot_config();
        let joined: Vec<&str> = activity
            .added_members_other_than_recipient()
            .map(|m| m.id.as_str())
            .collect();

        if !bot.greet_new_members || joined.is_empty() {
            return ActivityOutcome::Ignored;
        }

        info!(members = ?joined, "Welcoming new conversation members");
        ActivityOutcome::Replied(activity.reply(&bot.welcome_text))
    }
}
