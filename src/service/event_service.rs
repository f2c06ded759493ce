use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    domain::{Event, EventRangeQuery, EventRequest, EventSpan},
    error::{AppError, Result},
    repository::EventRepository,
};

pub struct EventService {
    repo: Arc<dyn EventRepository>,
}

impl EventService {
    pub fn new(repo: Arc<dyn EventRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, range: &EventRangeQuery) -> Result<Vec<Event>> {
        if let (Some(from), Some(to)) = (range.from, range.to) {
            if to < from {
                return Err(AppError::BadRequest("'to' cannot be earlier than 'from'".to_string()));
            }
        }
        self.repo.list(range.from, range.to).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Event> {
        self.repo.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    pub async fn create(&self, request: EventRequest) -> Result<Event> {
        let (title, span) = validate(&request)?;
        let now = Utc::now();

        let event = Event {
            id: Uuid::new_v4(),
            title,
            description: request.description.trim().to_string(),
            start_date: span.start_date,
            end_date: span.end_date,
            start_time: span.start_time,
            end_time: span.end_time,
            created_at: now,
            updated_at: now,
        };

        let event = self.repo.create(event).await?;
        tracing::info!("Created event {} on {}", event.id, event.start_date);
        Ok(event)
    }

    /// Replaces an event's title, description and span.
    pub async fn update(&self, id: Uuid, request: EventRequest) -> Result<Event> {
        let current = self.get(id).await?;
        let (title, span) = validate(&request)?;

        let event = Event {
            id,
            title,
            description: request.description.trim().to_string(),
            start_date: span.start_date,
            end_date: span.end_date,
            start_time: span.start_time,
            end_time: span.end_time,
            created_at: current.created_at,
            updated_at: Utc::now(),
        };

        self.repo.update(id, event).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.repo.delete(id).await? {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
        tracing::info!("Deleted event {}", id);
        Ok(())
    }
}

// Runs every check before anything is written
fn validate(request: &EventRequest) -> Result<(String, EventSpan)> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Missing required fields: title".to_string()));
    }

    let span = EventSpan::normalize(request)?;
    Ok((title.to_string(), span))
}
