use crate::reference::User;

pub struct DomainStubs;

impl DomainStubs {
    /// Usuarios de ejemplo para demos y pruebas: un solicitante, dos
    /// funcionarios activos y uno inactivo.
    pub fn sample_users() -> Vec<User> {
        vec![User::new(1, "estudiante01", "Ana Estudiante", true).with_role("STUDENT"),
             User::new(2, "jperez", "Juan Pérez", true).with_role("STAFF"),
             User::new(3, "mgomez", "María Gómez", true).with_role("STAFF"),
             User::new(4, "lruiz", "Luis Ruiz", false).with_role("STAFF")]
    }
}
