pub mod routes {
    pub mod pay;
}

pub mod services {
    pub mod pay;
}

pub mod dtos {
    pub mod pay;
}

pub mod models {
    pub mod pricing;
}

pub mod mount;

pub use mount::{mount_pay, mount_serverless};
