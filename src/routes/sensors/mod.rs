mod handlers;
mod types;

pub use handlers::{delete_sensor, get_sensor, list_sensors, register_sensor, update_sensor};
pub use types::{RegisterSensorRequest, SensorResponse, SensorsQuery, UpdateSensorRequest};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_delete_sensor, __path_get_sensor, __path_list_sensors, __path_register_sensor,
    __path_update_sensor,
};
