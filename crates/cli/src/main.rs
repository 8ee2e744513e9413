use clap::{Parser, Subcommand};
use mediq_core::collaborators::{
    annotate_note, document_note, transcribe_note, AudioPayload, DirectoryUploader,
    PlaceholderInsights, PlaceholderTranscriber,
};
use mediq_core::config::{namespace_from_env_value, status_transitions_from_env_value};
use mediq_core::dose::Dose;
use mediq_core::records::{
    CreatePatientRequest, EventType, MedicationStatus, NewCalendarEvent, NewClinicalNote,
    NewPatientMedication, NewPatientVital, NoteType, PatientStatus, PatientUpdate, Sex,
};
use mediq_core::constants::DOCUMENTS_DIR;
use mediq_core::{CoreConfig, ExportScope, Repository, SlotState, DEFAULT_DATA_DIR};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mediq")]
#[command(about = "MedIQ clinical record store CLI")]
struct Cli {
    /// Data directory (overrides MEDIQ_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all patients
    List,
    /// Show one patient as JSON
    Show {
        /// Patient id
        id: String,
    },
    /// Register a new patient
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: u32,
        /// M, F or Other
        #[arg(long)]
        sex: Sex,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        city: Option<String>,
    },
    /// Update fields of an existing patient
    Update {
        /// Patient id
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        sex: Option<Sex>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        city: Option<String>,
        /// new, stable, follow-up, urgent or inactive
        #[arg(long)]
        status: Option<PatientStatus>,
    },
    /// Delete a patient and everything recorded against them
    Delete {
        /// Patient id
        id: String,
    },
    /// List clinical notes
    Notes {
        /// Only notes for this patient
        #[arg(long)]
        patient: Option<String>,
    },
    /// Add a clinical note
    AddNote {
        /// Patient id
        patient_id: String,
        /// Note text
        content: String,
        /// text, voice or prescription
        #[arg(long = "type", default_value = "text")]
        note_type: NoteType,
    },
    /// Transcribe a recording and store it as a voice note
    VoiceNote {
        /// Patient id
        patient_id: String,
        /// Audio file to transcribe
        audio: PathBuf,
        /// MIME type of the recording
        #[arg(long, default_value = "audio/webm")]
        content_type: String,
    },
    /// Store a document and add a note linking to it
    Attach {
        /// Patient id
        patient_id: String,
        /// File to store
        file: PathBuf,
        /// Text placed above the document link
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List calendar events
    Events {
        /// Only events on this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },
    /// List today's events
    Today,
    /// Add a calendar event
    AddEvent {
        /// Date (YYYY-MM-DD)
        date: String,
        /// Time (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Patient id
        #[arg(long)]
        patient: Option<String>,
        /// appointment, task or reminder
        #[arg(long = "type", default_value = "appointment")]
        event_type: EventType,
        #[arg(long)]
        title: Option<String>,
    },
    /// Record a set of vital signs
    AddVital {
        /// Patient id
        patient_id: String,
        /// Blood pressure, e.g. 120/80
        #[arg(long)]
        bp: Option<String>,
        /// Heart rate in beats per minute
        #[arg(long)]
        hr: Option<u32>,
        /// Temperature in degrees Celsius
        #[arg(long)]
        temp: Option<f64>,
        /// Weight in kilograms
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List a patient's vital signs
    Vitals {
        /// Patient id
        patient_id: String,
    },
    /// Add a medication to a patient
    AddMedication {
        /// Patient id
        patient_id: String,
        #[arg(long)]
        name: String,
        /// Dose, e.g. 10mg
        #[arg(long)]
        dosage: String,
        #[arg(long)]
        frequency: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<String>,
        /// active, inactive or paused
        #[arg(long, default_value = "active")]
        status: MedicationStatus,
    },
    /// List a patient's medications
    Medications {
        /// Patient id
        patient_id: String,
        /// Only active medications
        #[arg(long)]
        active: bool,
    },
    /// Show dashboard counters
    Stats,
    /// Export the store as JSON
    Export {
        /// Include vitals and medications
        #[arg(long)]
        full: bool,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replace the store contents with an export file
    Import {
        /// Export file to read
        file: PathBuf,
    },
    /// Seed demo records into an empty store
    Seed,
    /// Render a Markdown prescription for a patient
    Prescription {
        /// Patient id
        patient_id: String,
        /// Prescribing doctor
        #[arg(long)]
        doctor: String,
        /// Prescription instructions
        #[arg(long)]
        content: String,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Split a dose string such as 10mg into value and unit
    ParseDose {
        dose: String,
    },
    /// Report any stored collection that cannot be read
    Check,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("mediq=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'mediq --help' for commands");
        return Ok(());
    };

    // Parsing a dose needs no store.
    if let Commands::ParseDose { dose } = &command {
        let parsed = Dose::parse(dose);
        match parsed.known_unit() {
            Some(unit) => println!("Value: {}, Unit: {}", parsed.value, unit.label()),
            None => println!("Value: {}, Unit: {} (unrecognised)", parsed.value, parsed.unit),
        }
        if let Err(e) = Dose::validate_value(&parsed.value) {
            eprintln!("Warning: {}", e);
        }
        return Ok(());
    }

    // Only `seed` writes sample data.
    let seeding = matches!(command, Commands::Seed);
    let cfg = Arc::new(config_from_env(cli.data_dir)?.with_sample_data(seeding));
    let repo = Repository::open(cfg)?;

    match command {
        Commands::List => {
            let patients = repo.list_patients();
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    println!(
                        "ID: {}, MRN: {}, Name: {}, Age: {}, Status: {}",
                        patient.id, patient.mrn, patient.name, patient.age, patient.status
                    );
                }
            }
        }
        Commands::Show { id } => match repo.get_patient(&id) {
            Some(patient) => println!("{}", serde_json::to_string_pretty(&patient)?),
            None => eprintln!("Patient with ID {} not found", id),
        },
        Commands::Create {
            name,
            age,
            sex,
            phone,
            city,
        } => {
            let patient = repo.create_patient(CreatePatientRequest {
                name,
                age,
                sex,
                phone,
                city,
            })?;
            println!("Created patient {} with MRN {}", patient.id, patient.mrn);
        }
        Commands::Update {
            id,
            name,
            age,
            sex,
            phone,
            city,
            status,
        } => {
            let update = PatientUpdate {
                name,
                age,
                sex,
                phone,
                city,
                status,
                last_visit: None,
            };
            let patient = repo.update_patient(&id, update)?;
            println!("Updated patient {}", patient.id);
        }
        Commands::Delete { id } => {
            repo.delete_patient(&id)?;
            println!("Deleted patient {}", id);
        }
        Commands::Notes { patient } => {
            let notes = match patient {
                Some(patient_id) => repo.list_notes_by_patient(&patient_id),
                None => repo.list_notes(),
            };
            if notes.is_empty() {
                println!("No notes found.");
            }
            for note in notes {
                println!(
                    "{} [{}] patient {} on {}: {}",
                    note.id,
                    note.note_type,
                    note.patient_id,
                    note.date.format("%Y-%m-%d %H:%M"),
                    note.content
                );
            }
        }
        Commands::AddNote {
            patient_id,
            content,
            note_type,
        } => {
            let mut note = NewClinicalNote::text(patient_id, content);
            note.note_type = note_type;
            let note = repo.create_note(annotate_note(&PlaceholderInsights, note))?;
            println!("Created note {}", note.id);
        }
        Commands::VoiceNote {
            patient_id,
            audio,
            content_type,
        } => {
            let audio = AudioPayload {
                content_type,
                bytes: std::fs::read(&audio)?,
            };
            let note = transcribe_note(&PlaceholderTranscriber, &patient_id, &audio)?;
            let note = repo.create_note(annotate_note(&PlaceholderInsights, note))?;
            println!("Created voice note {}: {}", note.id, note.content);
        }
        Commands::Attach {
            patient_id,
            file,
            description,
        } => {
            if repo.get_patient(&patient_id).is_none() {
                eprintln!("Patient with ID {} not found", patient_id);
                return Ok(());
            }
            let payload = std::fs::read(&file)?;
            let uploader = DirectoryUploader::new(documents_dir(repo.config().data_dir()));
            let note = document_note(&uploader, &patient_id, &description, &payload)?;
            let note = repo.create_note(note)?;
            println!("Created note {}: {}", note.id, note.content);
        }
        Commands::Events { date } => {
            let events = match date {
                Some(date) => repo.list_events_by_date(&date),
                None => repo.list_events_resolved(),
            };
            print_events(&events);
        }
        Commands::Today => print_events(&repo.list_today_events()),
        Commands::AddEvent {
            date,
            time,
            patient,
            event_type,
            title,
        } => {
            let mut event = NewCalendarEvent::appointment(date, time.as_deref());
            event.patient_id = patient;
            event.event_type = event_type;
            event.title = title;
            let event = repo.create_event(event)?;
            println!("Created event {}", event.id);
        }
        Commands::AddVital {
            patient_id,
            bp,
            hr,
            temp,
            weight,
            notes,
        } => {
            let vital = repo.add_vital(
                &patient_id,
                NewPatientVital {
                    bp,
                    hr,
                    temp,
                    weight,
                    notes,
                    ..Default::default()
                },
            )?;
            println!("Recorded vital {}", vital.id);
        }
        Commands::Vitals { patient_id } => {
            for vital in repo.list_vitals(&patient_id) {
                println!("{}", serde_json::to_string(&vital)?);
            }
        }
        Commands::AddMedication {
            patient_id,
            name,
            dosage,
            frequency,
            start_date,
            end_date,
            status,
        } => {
            let parsed = Dose::parse(&dosage);
            if parsed.known_unit().is_none() {
                eprintln!("Warning: unrecognised dose unit '{}'", parsed.unit);
            }
            let medication = repo.add_medication(
                &patient_id,
                NewPatientMedication {
                    name,
                    dosage,
                    frequency,
                    start_date,
                    end_date,
                    status,
                    notes: None,
                },
            )?;
            println!("Added medication {}", medication.id);
        }
        Commands::Medications { patient_id, active } => {
            let medications = if active {
                repo.list_active_medications(&patient_id)
            } else {
                repo.list_medications(&patient_id)
            };
            for med in medications {
                println!(
                    "{} {} {} ({}) [{}]",
                    med.id, med.name, med.dosage, med.frequency, med.status
                );
            }
        }
        Commands::Stats => println!("{}", serde_json::to_string_pretty(&repo.compute_stats())?),
        Commands::Export { full, output } => {
            let scope = if full {
                ExportScope::Full
            } else {
                ExportScope::Core
            };
            let doc = repo.export_with(scope)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, doc)?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{}", doc),
            }
        }
        Commands::Import { file } => {
            let doc = std::fs::read_to_string(&file)?;
            let summary = repo.import_all(&doc)?;
            println!(
                "Imported {} patients, {} notes, {} events",
                summary.patients, summary.clinical_notes, summary.calendar_events
            );
        }
        Commands::Seed => {
            if repo.initialise_sample_data()? {
                println!("Seeded sample data.");
            } else {
                println!("Store already holds patients; nothing seeded.");
            }
        }
        Commands::Prescription {
            patient_id,
            doctor,
            content,
            output,
        } => {
            let doc = repo.prescription_for(&patient_id, &doctor, &content)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, doc.as_str())?;
                    println!("Wrote prescription to {}", path.display());
                }
                None => print!("{}", doc.as_str()),
            }
        }
        Commands::Check => {
            for health in repo.inspect_collections() {
                match health.state {
                    SlotState::Missing => println!("{}: missing", health.key),
                    SlotState::Loaded => println!("{}: ok", health.key),
                    SlotState::Recovered(reason) => {
                        println!("{}: UNREADABLE ({})", health.key, reason)
                    }
                }
            }
        }
        Commands::ParseDose { .. } => {}
    }

    Ok(())
}

fn print_events(events: &[mediq_core::records::CalendarEvent]) {
    if events.is_empty() {
        println!("No events found.");
    }
    for event in events {
        println!(
            "{} {} {} [{} / {}] {} {}",
            event.id,
            event.date,
            event.time.as_deref().unwrap_or("--:--"),
            event.event_type,
            event.status,
            event.title.as_deref().unwrap_or(""),
            event.patient_name.as_deref().unwrap_or("")
        );
    }
}

fn documents_dir(data_dir: &std::path::Path) -> PathBuf {
    std::env::var("MEDIQ_DOCUMENTS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir.join(DOCUMENTS_DIR))
}

fn config_from_env(data_dir: Option<PathBuf>) -> Result<CoreConfig, Box<dyn std::error::Error>> {
    let data_dir = data_dir.unwrap_or_else(|| {
        std::env::var("MEDIQ_DATA_DIR")
            .unwrap_or_else(|_| DEFAULT_DATA_DIR.into())
            .into()
    });
    let namespace = namespace_from_env_value(std::env::var("MEDIQ_NAMESPACE").ok());

    let transitions =
        status_transitions_from_env_value(std::env::var("MEDIQ_ENFORCE_TRANSITIONS").ok());
    let cfg = CoreConfig::new(data_dir, namespace)?.with_status_transitions(transitions);
    Ok(cfg)
}
