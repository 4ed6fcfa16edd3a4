//! Label-to-list routing.

use crate::config::ReplyRoutes;
use crate::pipeline::classifier::ReplyLabel;
use crate::trello::ListTarget;

/// Maps each reply label to its destination list, if any.
#[derive(Debug, Clone, Default)]
pub struct ListRouter {
    routes: ReplyRoutes,
}

impl ListRouter {
    pub fn new(routes: ReplyRoutes) -> Self {
        Self { routes }
    }

    /// Destination for `label`. `None` means leave the card where it is.
    ///
    /// Offers are never moved automatically.
    pub fn destination(&self, label: ReplyLabel) -> Option<ListTarget> {
        let id = match label {
            ReplyLabel::InitialInterview => self.routes.initial_interview.as_ref(),
            ReplyLabel::CodingChallenge => self.routes.coding_challenge.as_ref(),
            ReplyLabel::TechnicalInterview => self.routes.technical_interview.as_ref(),
            ReplyLabel::HrInterview => self.routes.hr_interview.as_ref(),
            ReplyLabel::Rejection => self.routes.rejected.as_ref(),
            ReplyLabel::OtherReply => self.routes.other_reply.as_ref(),
            ReplyLabel::Offer => None,
        }?;
        Some(ListTarget {
            id: id.clone(),
            name: label.display_name().to_string(),
        })
    }
}
