use std::sync::Arc;

use adapter::database::ConnectionPool;
use adapter::discord::DiscordClient;
use adapter::gmail::GmailClient;
use adapter::renderer::TextTableRenderer;
use adapter::repository::health::HealthCheckRepositoryImpl;
use adapter::repository::reservation::ReservationRepositoryImpl;
use adapter::switchbot::SwitchBotClient;
use kernel::model::id::ChannelId;
use kernel::port::chat::ChatPort;
use kernel::port::mailbox::MailboxPort;
use kernel::port::meter::MeterPort;
use kernel::port::renderer::TableRenderer;
use kernel::repository::health::HealthCheckRepository;
use kernel::repository::reservation::ReservationRepository;
use kernel::service::audit::AuditLog;
use kernel::service::board::ReservationBoard;
use shared::config::AppConfig;

#[derive(Clone)]
pub struct AppRegistry {
    health_check_repository: Arc<dyn HealthCheckRepository>,
    reservation_repository: Arc<dyn ReservationRepository>,
    chat: Arc<dyn ChatPort>,
    renderer: Arc<dyn TableRenderer>,
    meter: Arc<dyn MeterPort>,
    mailbox: Arc<dyn MailboxPort>,
    reservation_board: Arc<ReservationBoard>,
    audit_log: Arc<AuditLog>,
    config: Arc<AppConfig>,
}

impl AppRegistry {
    pub fn new(pool: ConnectionPool, app_config: AppConfig) -> Self {
        let health_check_repository = Arc::new(HealthCheckRepositoryImpl::new(pool.clone()));
        let reservation_repository: Arc<dyn ReservationRepository> =
            Arc::new(ReservationRepositoryImpl::new(pool.clone()));
        let chat: Arc<dyn ChatPort> = Arc::new(DiscordClient::new(&app_config.discord));
        let renderer: Arc<dyn TableRenderer> = Arc::new(TextTableRenderer);
        let meter: Arc<dyn MeterPort> = Arc::new(SwitchBotClient::new(&app_config.switchbot));
        let mailbox: Arc<dyn MailboxPort> = Arc::new(GmailClient::new(&app_config.gmail));

        let reservation_board = Arc::new(ReservationBoard::new(
            chat.clone(),
            renderer.clone(),
            reservation_repository.clone(),
            ChannelId::new(app_config.discord.board_channel),
        ));
        let audit_log = Arc::new(AuditLog::new(
            chat.clone(),
            renderer.clone(),
            ChannelId::new(app_config.discord.log_channel),
        ));

        Self {
            health_check_repository,
            reservation_repository,
            chat,
            renderer,
            meter,
            mailbox,
            reservation_board,
            audit_log,
            config: Arc::new(app_config),
        }
    }

    pub fn health_check_repository(&self) -> Arc<dyn HealthCheckRepository> {
        self.health_check_repository.clone()
    }

    pub fn reservation_repository(&self) -> Arc<dyn ReservationRepository> {
        self.reservation_repository.clone()
    }

    pub fn chat(&self) -> Arc<dyn ChatPort> {
        self.chat.clone()
    }

    pub fn renderer(&self) -> Arc<dyn TableRenderer> {
        self.renderer.clone()
    }

    pub fn meter(&self) -> Arc<dyn MeterPort> {
        self.meter.clone()
    }

    pub fn mailbox(&self) -> Arc<dyn MailboxPort> {
        self.mailbox.clone()
    }

    pub fn reservation_board(&self) -> Arc<ReservationBoard> {
        self.reservation_board.clone()
    }

    pub fn audit_log(&self) -> Arc<AuditLog> {
        self.audit_log.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
