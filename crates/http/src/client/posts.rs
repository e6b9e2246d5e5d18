//! Link-post API client methods

use tracing::{error, info};

use super::{ApiClient, ClientError, RequestOptions};
use crate::types::{CreatePost, Post};

pub const POSTS_PATH: &str = "/post";

impl ApiClient {
    /// Submit a new link
    pub async fn create_post(&self, post: CreatePost) -> Result<Post, ClientError> {
        let post = post
            .validate()
            .inspect_err(|err| error!(error = %err, "Post rejected before sending"))?;

        let created: Post = self.post(POSTS_PATH, &post, RequestOptions::new()).await?;
        info!(post_id = %created.id, url = %created.url, "Post created");
        Ok(created)
    }
}
