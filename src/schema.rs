use ::util::json::Value;

/// Get the app schema: one entry per document table, with the indexed fields
/// and the summary projection (used for partition side indexes) for each.
pub fn get_schema() -> Value {
    json!({
        "articles": {
            "indexes": [
                {"fields": ["url"]},
                {"fields": ["author"]}
            ],
            "summary": {"title": "headline", "date": "published_at"}
        },
        "victims": {
            "indexes": [
                {"fields": ["article_id"]},
                {"fields": ["name"]}
            ],
            "summary": {"title": "name", "date": "died_on"}
        },
        "incidents": {
            "indexes": [
                {"fields": ["city"]},
                {"fields": ["victim_ids"]}
            ],
            "summary": {"title": "title", "date": "occurred_on"}
        }
    })
}
