model! {
    #[derive(Serialize, Deserialize, Debug, Clone)]
    pub struct Victim {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub age: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub gender: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub died_on: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub city: Option<String>,
        /// the article this victim was reported in
        #[serde(skip_serializing_if = "Option::is_none")]
        pub article_id: Option<String>,
    }
}
make_storable!(Victim, "victims");
