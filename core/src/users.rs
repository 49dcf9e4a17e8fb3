//! Current-user and group-membership lookups.

use crate::client::SpClient;
use crate::error::ApiError;
use crate::http::Transport;
use crate::types::{Resource, UserInfo};
use crate::util::{filter_query, is_blank, odata_literal, odata_path_literal};

/// User operations, borrowed from `SpClient::users`.
pub struct Users<'a, T> {
    client: &'a SpClient<T>,
}

impl<'a, T: Transport> Users<'a, T> {
    pub(crate) fn new(client: &'a SpClient<T>) -> Self {
        Self { client }
    }

    /// The user the transport is authenticated as.
    pub fn current(&self) -> Resource<UserInfo> {
        let envelope = self.client.get(&self.client.api_url("web/currentuser"));
        Resource::from_single("current user", &envelope)
    }

    /// Looks up `email` among the members of site group `group`. `exists`
    /// tells whether the user is a member.
    pub fn in_group(&self, group: &str, email: &str) -> Resource<UserInfo> {
        if is_blank(group) || is_blank(email) {
            return Resource::failed(email, ApiError::InvalidInput("group and email cannot be blank".to_string()));
        }
        let url = self.client.api_url(&format!(
            "web/sitegroups/getByName({})/users?{}",
            odata_path_literal(group),
            filter_query(&format!("Email eq {}", odata_literal(email)))
        ));
        Resource::from_first(email, &self.client.get(&url))
    }
}
