//! A ticket's whole life, persisted to disk between steps.

use helpdesk::{
    Directory, HelpDesk,
    desk::{NewRole, NewService, NewTicket, Registration},
    domain::{EventType, IncidentCategory, ServiceKind, State, TicketKind, Urgency, UserId},
    storage::MemoryStore,
};
use tempfile::TempDir;

fn desk(directory: &Directory) -> HelpDesk<'_, MemoryStore> {
    HelpDesk::new(directory.store(), directory.config().clone())
}

fn register(directory: &Directory, name: &str, email: &str, role: NewRole) -> UserId {
    let user = desk(directory)
        .register_user(Registration {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role,
        })
        .unwrap();
    directory.save().unwrap();
    user.id().unwrap()
}

#[test]
fn ticket_lifecycle_survives_reloads() {
    let root = TempDir::new().unwrap();
    let directory = Directory::init(root.path().to_path_buf()).unwrap();

    let requester = register(
        &directory,
        "Rita Requester",
        "rita@example.com",
        NewRole::Requester {
            services: vec![NewService {
                kind: ServiceKind::MobilePhone,
                number: "1155550000".to_string(),
            }],
        },
    );
    let operator = register(
        &directory,
        "Oscar Operator",
        "oscar@comunicarlos.com.ar",
        NewRole::Operator,
    );
    let technician = register(
        &directory,
        "Tomas Tech",
        "tomas@comunicarlos.com.ar",
        NewRole::Technician {
            specialties: vec!["movil".to_string()],
        },
    );
    let supervisor = register(
        &directory,
        "Sara Supervisor",
        "sara@comunicarlos.com.ar",
        NewRole::Supervisor,
    );
    desk(&directory).add_supervisee(supervisor, technician).unwrap();
    directory.save().unwrap();
    drop(directory);

    let directory = Directory::open(root.path().to_path_buf()).unwrap();
    let ticket = desk(&directory)
        .create_ticket(
            requester,
            NewTicket {
                title: "SIM blocked".to_string(),
                description: "The phone asks for a PUK code".to_string(),
                kind: TicketKind::Incident {
                    urgency: Urgency::Important,
                    category: IncidentCategory::SimBlocked,
                },
            },
        )
        .unwrap();
    let id = ticket.id().unwrap();
    desk(&directory)
        .assign(id, technician, operator, None)
        .unwrap();
    desk(&directory)
        .resolve(id, technician, Some("Sent the PUK by SMS"))
        .unwrap();
    directory.save().unwrap();
    drop(directory);

    let directory = Directory::open(root.path().to_path_buf()).unwrap();
    let desk = desk(&directory);
    let ticket = desk.ticket(id, requester).unwrap();
    assert_eq!(ticket.state(), State::Resolved);
    assert!(ticket.resolution_time().is_some());

    let history: Vec<_> = desk
        .history(id, requester)
        .unwrap()
        .iter()
        .map(|event| event.event_type())
        .collect();
    assert_eq!(
        history,
        vec![
            EventType::Creation,
            EventType::Assignment,
            EventType::Comment,
            EventType::Resolution
        ]
    );

    // the technician's comment and resolution reached their supervisor
    let summary = desk.notification_summary(supervisor).unwrap();
    assert_eq!(summary.unread, 2);

    let reopened = desk.reopen(id, requester, "The PUK did not work").unwrap();
    assert_eq!(reopened.state(), State::Reopened);

    // sequences carry on where the previous session stopped
    let next = desk
        .create_ticket(
            requester,
            NewTicket {
                title: "Still blocked".to_string(),
                description: "Second attempt also failed".to_string(),
                kind: TicketKind::Incident {
                    urgency: Urgency::Critical,
                    category: IncidentCategory::SimBlocked,
                },
            },
        )
        .unwrap();
    assert_eq!(next.id(), Some(id + 1));
    assert_eq!(desk.prioritized(None, None).unwrap()[0].id(), Some(id + 1));
}

#[test]
fn opening_an_uninitialised_directory_fails() {
    let root = TempDir::new().unwrap();
    assert!(Directory::open(root.path().to_path_buf()).is_err());
}
