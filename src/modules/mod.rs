pub mod policy;

pub mod user {
    pub mod repository;
    pub mod repository_memory;
    pub mod repository_pg;
    pub mod schema;
}

pub mod property {
    pub mod repository;
    pub mod repository_memory;
    pub mod repository_pg;
    pub mod schema;
}

pub mod conversation {
    pub mod handle;
    pub mod model;
    pub mod read_state;
    pub mod repository;
    pub mod repository_memory;
    pub mod repository_pg;
    pub mod route;
    pub mod schema;
    pub mod service;
}

pub mod message {
    pub mod handle;
    pub mod model;
    pub mod repository;
    pub mod repository_memory;
    pub mod repository_pg;
    pub mod route;
    pub mod schema;
    pub mod service;
}

pub mod notification {
    pub mod dispatcher;
    pub mod events;
    pub mod handle;
    pub mod model;
    pub mod repository;
    pub mod repository_memory;
    pub mod repository_pg;
    pub mod route;
    pub mod schema;
    pub mod service;
}

pub mod websocket;
