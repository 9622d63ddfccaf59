pub mod html;
pub mod rss_proxy;
pub mod vk_api;
pub mod vk_mobile;

pub use rss_proxy::RssProxySource;
pub use vk_api::{VkApiSource, WallOwner};
pub use vk_mobile::VkMobileSource;

use crate::config::SourceConfig;
use crate::traits::SourceAdapter;
use crate::types::{FetchConfig, RelayError, Result};

/// Build the adapter selected by the configuration's `kind`.
pub fn build_source(
    source: &SourceConfig,
    fetch_config: &FetchConfig,
) -> Result<Box<dyn SourceAdapter>> {
    let adapter: Box<dyn SourceAdapter> = match source {
        SourceConfig::VkApi { domain, owner_id, access_token, api_version } => {
            let token = access_token.clone().ok_or_else(|| {
                RelayError::Config("vk_api source needs an access token".to_string())
            })?;
            let owner = match (owner_id, domain) {
                (Some(id), _) => WallOwner::OwnerId(*id),
                (None, Some(domain)) => WallOwner::Domain(domain.clone()),
                (None, None) => {
                    return Err(RelayError::Config(
                        "vk_api source needs a domain or owner_id".to_string(),
                    ));
                }
            };
            Box::new(VkApiSource::new(owner, token, api_version.clone(), fetch_config.clone())?)
        }
        SourceConfig::VkMobile { url } => {
            Box::new(VkMobileSource::new(url.clone(), fetch_config.clone())?)
        }
        SourceConfig::Rss { url } => {
            Box::new(RssProxySource::new(url.clone(), fetch_config.clone())?)
        }
    };
    Ok(adapter)
}
