use std::sync::Arc;

use crate::application::assets::AssetService;
use crate::application::content::ContentStore;

#[derive(Clone)]
pub struct ApiState {
    pub content: Arc<ContentStore>,
    pub assets: Arc<AssetService>,
    /// Shared bearer secret. `None` means every request is refused as
    /// misconfigured.
    pub token_secret: Option<Arc<str>>,
}
