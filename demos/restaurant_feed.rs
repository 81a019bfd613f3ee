//! Restaurant feed example: filters, sorting, load-more and live edits
//!
//! Run with `RUST_LOG=tableside=debug cargo run --example restaurant_feed`
//! to see the session's structured logs alongside the output.

use tableside::prelude::*;
use tracing_subscriber::EnvFilter;

fn seed() -> Vec<Restaurant> {
    vec![
        Restaurant::new("Harbor House", ["Seafood", "American"], "$$$", 4.6)
            .with_address("12 Pier Road")
            .with_distance_km(1.2)
            .with_open_now(true),
        Restaurant::new("Pasta Fina", ["Italian"], "$$", 4.2)
            .with_address("3 Via Roma")
            .with_distance_km(0.4)
            .with_open_now(false),
        Restaurant::new("Green Leaf", ["Vegetarian", "Salads"], "$", 4.0)
            .with_dietary(["vegan", "gluten-free"])
            .with_distance_km(2.8)
            .with_open_now(true),
        Restaurant::new("Noodle Bar", ["Japanese"], "$", 4.4)
            .with_address("88 Market Street")
            .with_distance_km(0.9)
            .with_open_now(true),
        Restaurant::new("Smoke & Oak", ["Barbecue", "American"], "$$", 3.8)
            .with_distance_km(6.5),
        Restaurant::new("Le Petit", ["French"], "$$$$", 4.8)
            .with_address("1 Rue Haute")
            .with_distance_km(3.1)
            .with_open_now(false),
        Restaurant::new("Taqueria Sol", ["Mexican"], "$", 4.1)
            .with_distance_km(1.7)
            .with_open_now(true),
    ]
}

fn print_view(title: &str, session: &CollectionSession<Restaurant>) {
    let view = session.view_state();
    println!(
        "{} ({} of {}, sort: {})",
        title,
        view.displayed_items.len(),
        view.total_filtered_count,
        view.sort.label()
    );
    for restaurant in &view.displayed_items {
        println!(
            "   {:<14} {:<5} ★ {:.1}  {}",
            restaurant.name,
            restaurant.price,
            restaurant.rating,
            restaurant.cuisine.join(", ")
        );
    }
    if view.has_more {
        println!("   … more available");
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🍽  Tableside Restaurant Feed\n");

    let config = EngineConfig::restaurants().with_page_size(3);
    let session = create_session(InMemorySource::new(seed()), config).await?;
    tracing::info!(phase = %session.phase(), "Restaurant feed ready");
    print_view("📋 First page", &session);

    session.request_more().await?;
    print_view("📋 After load-more", &session);

    session.set_filter(
        FilterPatch::new()
            .select("price", ["$", "$$"])
            .flag("open_now", true),
    )?;
    print_view("🔍 Affordable and open", &session);

    let summary = session.active_filter_summary();
    println!("🏷  {} active filters: {}\n", summary.count, summary.clauses.join(" | "));

    session.set_sort(SortOption::Name)?;
    print_view("🔤 Sorted by name", &session);

    let target = session
        .view_state()
        .displayed_items
        .first()
        .map(|r| r.id);
    if let Some(id) = target {
        session.apply_edit(id, RestaurantPatch::default().open_now(Some(false)))?;
        print_view("✏️  After closing the first match", &session);
    }

    session.clear_filters()?;
    session.set_filter(FilterPatch::new().text("american"))?;
    print_view("🔍 Search \"american\"", &session);

    let mut events = session.subscribe();
    session.request_refresh().await?;
    while let Ok(envelope) = events.try_recv() {
        println!("📣 {}", envelope.event.action());
    }

    Ok(())
}
