pub mod imgur;

use crate::domain::comic::{FetchedImage, UploadResult};

pub use imgur::ImgurUploader;

#[async_trait::async_trait]
pub trait ImageUploader: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn upload(&self, image: &FetchedImage, title: &str) -> anyhow::Result<UploadResult>;
}
