use actix_web::web::{scope, ServiceConfig};

use crate::modules::notification::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/notifications")
            .service(list_notifications)
            .service(mark_all_notifications_read)
            .service(mark_notification_read)
            .service(delete_notification),
    );
}

pub fn events_configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/events")
            .service(on_property_unlocked)
            .service(on_inspection_booked)
            .service(on_inspection_scheduled)
            .service(on_new_match)
            .service(on_status_update)
            .service(on_new_property)
            .service(on_price_drop)
            .service(on_new_assignment),
    );
}
