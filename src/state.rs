use crate::config::settings::AppConfig;
use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::modules::media::service::MediaService;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub queue: RabbitMqService,
    pub media: MediaService,
}

impl AppState {
    pub fn new(config: AppConfig, queue: RabbitMqService, media: MediaService) -> Self {
        Self {
            config,
            queue,
            media,
        }
    }
}
