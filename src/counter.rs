use async_trait::async_trait;
use axum::http::{request::Parts, StatusCode};
use domain::{data, Context, Data, Error, EventHandler, Result};
use serde::Deserialize;
use std::time::Duration;

const FLASH_DURATION: Duration = Duration::from_secs(3);

pub fn mount(_parts: &Parts) -> (StatusCode, Data) {
    (StatusCode::OK, data!({"count": 0, "step": 1}))
}

#[derive(Debug, Deserialize)]
struct Step {
    by: i64,
}

/// Handles every event of the counter page.
pub struct Counter;

impl Counter {
    fn count(ctx: &Context) -> Result<i64> {
        match ctx.store().get::<i64>("count") {
            Ok(count) => Ok(count),
            Err(e) if e.is_key_not_found() => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn show(ctx: &Context, count: i64) {
        ctx.dom().morph("#count", "count", data!({"count": count}));
        ctx.dom()
            .toggle_class_list("#count", [("negative", count < 0)]);
    }
}

#[async_trait]
impl EventHandler for Counter {
    async fn handle(&self, ctx: &mut Context) -> Result<()> {
        let count = Self::count(ctx)?;
        match ctx.event().id.as_str() {
            "increment" => Self::show(ctx, count + 1),
            "decrement" => Self::show(ctx, count - 1),
            "step" => {
                let Step { by } = ctx.event().decode_params()?;
                if by == 0 {
                    return Err(Error::user("step must not be zero"));
                }
                Self::show(ctx, count + by);
            }
            "reset" => {
                Self::show(ctx, 0);
                ctx.dom()
                    .flash(FLASH_DURATION, data!({"message": "Counter reset"}));
            }
            other => return Err(Error::other(format!("unknown counter event {other}"))),
        }
        Ok(())
    }
}
