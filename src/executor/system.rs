//! System executor (§4.5): emoji-prefixed system/error messages.

use crate::platform::PlatformDyn;
use std::sync::Arc;

pub async fn post_system_message(platform: &Arc<dyn PlatformDyn>, channel: &str, text: &str) -> crate::Result<()> {
    platform.create_post(channel, &format!("ℹ️ {text}"), None).await?;
    Ok(())
}

pub async fn post_error_message(platform: &Arc<dyn PlatformDyn>, channel: &str, text: &str) -> crate::Result<()> {
    platform.create_post(channel, &format!("⚠️ {text}"), None).await?;
    Ok(())
}

pub async fn post_lifecycle_notice(platform: &Arc<dyn PlatformDyn>, channel: &str, text: &str) -> crate::Result<String> {
    let handle = platform.create_post(channel, &format!("🔄 {text}"), None).await?;
    Ok(handle.id)
}
