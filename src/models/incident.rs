//! An incident ties one event (a homicide, usually) to the articles that
//! reported it and the victims involved.

model! {
    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct Incident {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub occurred_on: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub address: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub city: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub victim_ids: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub article_ids: Option<Vec<String>>,
    }
}
make_storable!(Incident, "incidents");
