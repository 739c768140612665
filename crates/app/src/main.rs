use std::fmt;
use std::io::{self, Write as _};

use chrono::NaiveDate;
use colored::Colorize;
use services::{AppServices, Clock};
use study_core::model::{SessionDraft, SessionId, Student, StudentId, StudySession};

mod render;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { what: &'static str },
    UnknownArg(String),
    ConflictingFlags { first: &'static str, second: &'static str },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDate { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { what } => write!(f, "missing argument: {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::ConflictingFlags { first, second } => {
                write!(f, "{first} cannot be combined with {second}")
            }
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDate { raw } => {
                write!(f, "invalid date (expected YYYY-MM-DD): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug)]
enum SelectError {
    UnknownStudent { selector: String },
    AmbiguousStudent { selector: String },
    UnknownSession { selector: String },
    AmbiguousSession { selector: String },
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectError::UnknownStudent { selector } => {
                write!(f, "no student matches '{selector}'")
            }
            SelectError::AmbiguousStudent { selector } => {
                write!(f, "'{selector}' matches more than one student")
            }
            SelectError::UnknownSession { selector } => {
                write!(f, "no history entry matches '{selector}'")
            }
            SelectError::AmbiguousSession { selector } => {
                write!(f, "'{selector}' matches more than one history entry")
            }
        }
    }
}

impl std::error::Error for SelectError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_u32(flag: &'static str, raw: String) -> Result<u32, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn parse_date(raw: String) -> Result<NaiveDate, ArgsError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ArgsError::InvalidDate { raw })
}

/// Flags every subcommand accepts. Returns true when the flag was consumed.
fn common_flag(
    arg: &str,
    args: &mut impl Iterator<Item = String>,
    db_url: &mut String,
) -> Result<bool, ArgsError> {
    match arg {
        "--db" => {
            let value = require_value(args, "--db")?;
            if value.trim().is_empty() {
                return Err(ArgsError::InvalidDbUrl { raw: value });
            }
            *db_url = normalize_sqlite_url(value);
            Ok(true)
        }
        "--help" | "-h" => {
            print_usage();
            std::process::exit(0);
        }
        _ => Ok(false),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- list    [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- add     <name> [--contact <text>] [--start-date <YYYY-MM-DD>]");
    eprintln!("  cargo run -p app -- edit    <student> [--name <text>] [--contact <text>] [--start-date <YYYY-MM-DD>]");
    eprintln!("  cargo run -p app -- record  <student> (--lesson <n> | --next) [--paragraph <n>] [--date <YYYY-MM-DD>]");
    eprintln!("                              [--hours <n>] [--minutes <0-59>] [--notes <text>]");
    eprintln!("  cargo run -p app -- amend   <student> <session> [--lesson <n>] [--paragraph <n>] [--date <YYYY-MM-DD>]");
    eprintln!("                              [--hours <n>] [--minutes <0-59>] [--notes <text>]");
    eprintln!("  cargo run -p app -- forget  <student> <session> [--yes]");
    eprintln!("  cargo run -p app -- remove  <student> [--yes]");
    eprintln!("  cargo run -p app -- history <student>");
    eprintln!("  cargo run -p app -- tips    <student> [--topic <text>]");
    eprintln!();
    eprintln!("<student> is a name, an id, or a unique id prefix; <session> is an id or prefix.");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://students.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_TIPS_API_KEY, STUDY_TIPS_BASE_URL, STUDY_TIPS_MODEL");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    List,
    Add,
    Edit,
    Remove,
    Record,
    Amend,
    Forget,
    History,
    Tips,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "list" => Some(Self::List),
            "add" => Some(Self::Add),
            "edit" => Some(Self::Edit),
            "remove" => Some(Self::Remove),
            "record" => Some(Self::Record),
            "amend" => Some(Self::Amend),
            "forget" => Some(Self::Forget),
            "history" => Some(Self::History),
            "tips" => Some(Self::Tips),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct AddArgs {
    name: String,
    contact: String,
    start_date: Option<NaiveDate>,
}

impl AddArgs {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        db_url: &mut String,
    ) -> Result<Self, ArgsError> {
        let mut name = None;
        let mut contact = String::new();
        let mut start_date = None;

        while let Some(arg) = args.next() {
            if common_flag(&arg, args, db_url)? {
                continue;
            }
            match arg.as_str() {
                "--contact" => contact = require_value(args, "--contact")?,
                "--start-date" => {
                    start_date = Some(parse_date(require_value(args, "--start-date")?)?);
                }
                _ if !arg.starts_with('-') && name.is_none() => name = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            name: name.ok_or(ArgsError::MissingArgument { what: "<name>" })?,
            contact,
            start_date,
        })
    }
}

#[derive(Debug)]
struct EditArgs {
    selector: String,
    name: Option<String>,
    contact: Option<String>,
    start_date: Option<NaiveDate>,
}

impl EditArgs {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        db_url: &mut String,
    ) -> Result<Self, ArgsError> {
        let mut selector = None;
        let mut name = None;
        let mut contact = None;
        let mut start_date = None;

        while let Some(arg) = args.next() {
            if common_flag(&arg, args, db_url)? {
                continue;
            }
            match arg.as_str() {
                "--name" => name = Some(require_value(args, "--name")?),
                "--contact" => contact = Some(require_value(args, "--contact")?),
                "--start-date" => {
                    start_date = Some(parse_date(require_value(args, "--start-date")?)?);
                }
                _ if !arg.starts_with('-') && selector.is_none() => selector = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            selector: selector.ok_or(ArgsError::MissingArgument { what: "<student>" })?,
            name,
            contact,
            start_date,
        })
    }
}

struct RemoveArgs {
    selector: String,
    yes: bool,
}

impl RemoveArgs {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        db_url: &mut String,
    ) -> Result<Self, ArgsError> {
        let mut selector = None;
        let mut yes = false;

        while let Some(arg) = args.next() {
            if common_flag(&arg, args, db_url)? {
                continue;
            }
            match arg.as_str() {
                "--yes" => yes = true,
                _ if !arg.starts_with('-') && selector.is_none() => selector = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            selector: selector.ok_or(ArgsError::MissingArgument { what: "<student>" })?,
            yes,
        })
    }
}

#[derive(Debug)]
struct RecordArgs {
    selector: String,
    /// `None` means `--next`: take the student's suggested next lesson.
    lesson: Option<u32>,
    paragraph: Option<u32>,
    date: Option<NaiveDate>,
    hours: u32,
    minutes: u32,
    notes: Option<String>,
}

impl RecordArgs {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        db_url: &mut String,
    ) -> Result<Self, ArgsError> {
        let mut selector = None;
        let mut lesson = None;
        let mut next = false;
        let mut paragraph = None;
        let mut date = None;
        let mut hours = 0;
        let mut minutes = 0;
        let mut notes = None;

        while let Some(arg) = args.next() {
            if common_flag(&arg, args, db_url)? {
                continue;
            }
            match arg.as_str() {
                "--lesson" => lesson = Some(parse_u32("--lesson", require_value(args, "--lesson")?)?),
                "--next" => next = true,
                "--paragraph" => {
                    paragraph = Some(parse_u32("--paragraph", require_value(args, "--paragraph")?)?);
                }
                "--date" => date = Some(parse_date(require_value(args, "--date")?)?),
                "--hours" => hours = parse_u32("--hours", require_value(args, "--hours")?)?,
                "--minutes" => minutes = parse_u32("--minutes", require_value(args, "--minutes")?)?,
                "--notes" => notes = Some(require_value(args, "--notes")?),
                _ if !arg.starts_with('-') && selector.is_none() => selector = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if next && lesson.is_some() {
            return Err(ArgsError::ConflictingFlags {
                first: "--lesson",
                second: "--next",
            });
        }
        if !next && lesson.is_none() {
            return Err(ArgsError::MissingArgument { what: "--lesson" });
        }

        Ok(Self {
            selector: selector.ok_or(ArgsError::MissingArgument { what: "<student>" })?,
            lesson,
            paragraph,
            date,
            hours,
            minutes,
            notes,
        })
    }
}

struct AmendArgs {
    selector: String,
    session: String,
    lesson: Option<u32>,
    paragraph: Option<u32>,
    date: Option<NaiveDate>,
    hours: Option<u32>,
    minutes: Option<u32>,
    notes: Option<String>,
}

impl AmendArgs {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        db_url: &mut String,
    ) -> Result<Self, ArgsError> {
        let mut selector = None;
        let mut session = None;
        let mut lesson = None;
        let mut paragraph = None;
        let mut date = None;
        let mut hours = None;
        let mut minutes = None;
        let mut notes = None;

        while let Some(arg) = args.next() {
            if common_flag(&arg, args, db_url)? {
                continue;
            }
            match arg.as_str() {
                "--lesson" => lesson = Some(parse_u32("--lesson", require_value(args, "--lesson")?)?),
                "--paragraph" => {
                    paragraph = Some(parse_u32("--paragraph", require_value(args, "--paragraph")?)?);
                }
                "--date" => date = Some(parse_date(require_value(args, "--date")?)?),
                "--hours" => hours = Some(parse_u32("--hours", require_value(args, "--hours")?)?),
                "--minutes" => {
                    minutes = Some(parse_u32("--minutes", require_value(args, "--minutes")?)?);
                }
                "--notes" => notes = Some(require_value(args, "--notes")?),
                _ if !arg.starts_with('-') && selector.is_none() => selector = Some(arg),
                _ if !arg.starts_with('-') && session.is_none() => session = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            selector: selector.ok_or(ArgsError::MissingArgument { what: "<student>" })?,
            session: session.ok_or(ArgsError::MissingArgument { what: "<session>" })?,
            lesson,
            paragraph,
            date,
            hours,
            minutes,
            notes,
        })
    }
}

struct ForgetArgs {
    selector: String,
    session: String,
    yes: bool,
}

impl ForgetArgs {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        db_url: &mut String,
    ) -> Result<Self, ArgsError> {
        let mut selector = None;
        let mut session = None;
        let mut yes = false;

        while let Some(arg) = args.next() {
            if common_flag(&arg, args, db_url)? {
                continue;
            }
            match arg.as_str() {
                "--yes" => yes = true,
                _ if !arg.starts_with('-') && selector.is_none() => selector = Some(arg),
                _ if !arg.starts_with('-') && session.is_none() => session = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            selector: selector.ok_or(ArgsError::MissingArgument { what: "<student>" })?,
            session: session.ok_or(ArgsError::MissingArgument { what: "<session>" })?,
            yes,
        })
    }
}

struct SelectorArgs {
    selector: String,
}

impl SelectorArgs {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        db_url: &mut String,
    ) -> Result<Self, ArgsError> {
        let mut selector = None;

        while let Some(arg) = args.next() {
            if common_flag(&arg, args, db_url)? {
                continue;
            }
            match arg.as_str() {
                _ if !arg.starts_with('-') && selector.is_none() => selector = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            selector: selector.ok_or(ArgsError::MissingArgument { what: "<student>" })?,
        })
    }
}

struct TipsArgs {
    selector: String,
    topic: Option<String>,
}

impl TipsArgs {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        db_url: &mut String,
    ) -> Result<Self, ArgsError> {
        let mut selector = None;
        let mut topic = None;

        while let Some(arg) = args.next() {
            if common_flag(&arg, args, db_url)? {
                continue;
            }
            match arg.as_str() {
                "--topic" => topic = Some(require_value(args, "--topic")?),
                _ if !arg.starts_with('-') && selector.is_none() => selector = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            selector: selector.ok_or(ArgsError::MissingArgument { what: "<student>" })?,
            topic,
        })
    }
}

enum Action {
    List,
    Add(AddArgs),
    Edit(EditArgs),
    Remove(RemoveArgs),
    Record(RecordArgs),
    Amend(AmendArgs),
    Forget(ForgetArgs),
    History(SelectorArgs),
    Tips(TipsArgs),
}

fn parse_action(
    cmd: Command,
    args: &mut impl Iterator<Item = String>,
    db_url: &mut String,
) -> Result<Action, ArgsError> {
    match cmd {
        Command::List => {
            while let Some(arg) = args.next() {
                if !common_flag(&arg, args, db_url)? {
                    return Err(ArgsError::UnknownArg(arg));
                }
            }
            Ok(Action::List)
        }
        Command::Add => Ok(Action::Add(AddArgs::parse(args, db_url)?)),
        Command::Edit => Ok(Action::Edit(EditArgs::parse(args, db_url)?)),
        Command::Remove => Ok(Action::Remove(RemoveArgs::parse(args, db_url)?)),
        Command::Record => Ok(Action::Record(RecordArgs::parse(args, db_url)?)),
        Command::Amend => Ok(Action::Amend(AmendArgs::parse(args, db_url)?)),
        Command::Forget => Ok(Action::Forget(ForgetArgs::parse(args, db_url)?)),
        Command::History => Ok(Action::History(SelectorArgs::parse(args, db_url)?)),
        Command::Tips => Ok(Action::Tips(TipsArgs::parse(args, db_url)?)),
    }
}

/// Finds a student by id, exact name (case-insensitive) or unique id prefix.
fn resolve_student<'a>(
    students: &'a [Student],
    selector: &str,
) -> Result<&'a Student, SelectError> {
    if let Ok(id) = selector.parse::<StudentId>() {
        if let Some(student) = students.iter().find(|s| s.id() == id) {
            return Ok(student);
        }
    }

    let lowered = selector.to_lowercase();
    let mut by_name = students.iter().filter(|s| s.name().to_lowercase() == lowered);
    if let Some(first) = by_name.next() {
        return if by_name.next().is_some() {
            Err(SelectError::AmbiguousStudent {
                selector: selector.to_owned(),
            })
        } else {
            Ok(first)
        };
    }

    let mut by_prefix = students
        .iter()
        .filter(|s| s.id().to_string().starts_with(&lowered));
    match (by_prefix.next(), by_prefix.next()) {
        (Some(student), None) => Ok(student),
        (Some(_), Some(_)) => Err(SelectError::AmbiguousStudent {
            selector: selector.to_owned(),
        }),
        (None, _) => Err(SelectError::UnknownStudent {
            selector: selector.to_owned(),
        }),
    }
}

fn resolve_session(student: &Student, selector: &str) -> Result<SessionId, SelectError> {
    if let Ok(id) = selector.parse::<SessionId>() {
        if student.session(id).is_some() {
            return Ok(id);
        }
    }

    let lowered = selector.to_lowercase();
    let mut matches = student
        .history()
        .iter()
        .map(StudySession::id)
        .filter(|id| id.to_string().starts_with(&lowered));
    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(id),
        (Some(_), Some(_)) => Err(SelectError::AmbiguousSession {
            selector: selector.to_owned(),
        }),
        (None, _) => Err(SelectError::UnknownSession {
            selector: selector.to_owned(),
        }),
    }
}

fn confirm(question: &str) -> io::Result<bool> {
    print!("{question} [s/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(matches!(answer.as_str(), "s" | "sim" | "y" | "yes"))
}

fn cmd_list(services: &AppServices) {
    let students = services.roster().students();
    if students.is_empty() {
        println!("Nenhum estudante cadastrado.");
        return;
    }
    for student in &students {
        render::print_student_card(student);
        println!();
    }
}

async fn cmd_add(
    services: &AppServices,
    args: AddArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let roster = services.roster();
    let id = roster
        .add_student(args.name, args.contact, args.start_date)
        .await?;

    if let Some(student) = roster.student(id) {
        println!(
            "{} Estudante cadastrado: {} [{}]",
            "✓".green(),
            student.name().bold(),
            render::short_id(id),
        );
    }
    Ok(())
}

async fn cmd_edit(
    services: &AppServices,
    args: EditArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let roster = services.roster();
    let students = roster.students();
    let student = resolve_student(&students, &args.selector)?;

    let name = args.name.unwrap_or_else(|| student.name().to_owned());
    let contact = args.contact.unwrap_or_else(|| student.contact().to_owned());
    let start_date = args.start_date.unwrap_or_else(|| student.start_date());
    roster
        .edit_student(student.id(), name, contact, start_date)
        .await?;

    println!("{} Estudante atualizado.", "✓".green());
    Ok(())
}

async fn cmd_remove(
    services: &AppServices,
    args: RemoveArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let roster = services.roster();
    let students = roster.students();
    let student = resolve_student(&students, &args.selector)?;

    if !args.yes && !confirm("Tem certeza que deseja excluir este estudante?")? {
        println!("Operação cancelada.");
        return Ok(());
    }

    let name = student.name().to_owned();
    roster.remove_student(student.id()).await?;
    println!("{} Estudante excluído: {name}", "✓".green());
    Ok(())
}

async fn cmd_record(
    services: &AppServices,
    args: RecordArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let roster = services.roster();
    let students = roster.students();
    let student = resolve_student(&students, &args.selector)?;
    let student_id = student.id();

    let (lesson, paragraph) = match args.lesson {
        Some(lesson) => (lesson, args.paragraph.unwrap_or(0)),
        None => {
            let (lesson, paragraph) = student.suggested_next_lesson();
            (lesson, args.paragraph.unwrap_or(paragraph))
        }
    };

    let session_id = roster
        .record_session(
            student_id,
            lesson,
            paragraph,
            args.date,
            args.hours,
            args.minutes,
            args.notes,
        )
        .await?;

    println!(
        "{} Registro salvo [{}]",
        "✓".green(),
        render::short_id(session_id),
    );
    if let Some(student) = roster.student(student_id) {
        println!(
            "  progresso atual: Lição {} de {}{}",
            student.current_lesson(),
            student.total_lessons(),
            render::paragraph_suffix(student.current_paragraph()),
        );
    }
    Ok(())
}

async fn cmd_amend(
    services: &AppServices,
    args: AmendArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let roster = services.roster();
    let students = roster.students();
    let student = resolve_student(&students, &args.selector)?;
    let session_id = resolve_session(student, &args.session)?;
    let Some(current) = student.session(session_id) else {
        return Err(SelectError::UnknownSession {
            selector: args.session,
        }
        .into());
    };

    let mut draft = SessionDraft::new(
        args.lesson.unwrap_or_else(|| current.lesson()),
        args.paragraph.unwrap_or_else(|| current.paragraph()),
        args.date.unwrap_or_else(|| current.date()),
    )
    .with_duration(
        args.hours.unwrap_or_else(|| current.hours()),
        args.minutes.unwrap_or_else(|| current.minutes()),
    );
    let notes = args.notes.or_else(|| current.notes().map(str::to_owned));
    if let Some(notes) = notes {
        draft = draft.with_notes(notes);
    }

    roster.amend_session(student.id(), session_id, draft).await?;
    println!("{} Registro atualizado.", "✓".green());
    Ok(())
}

async fn cmd_forget(
    services: &AppServices,
    args: ForgetArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let roster = services.roster();
    let students = roster.students();
    let student = resolve_student(&students, &args.selector)?;
    let session_id = resolve_session(student, &args.session)?;

    if !args.yes && !confirm("Tem certeza que deseja excluir este registro?")? {
        println!("Operação cancelada.");
        return Ok(());
    }

    let student_id = student.id();
    roster.remove_session(student_id, session_id).await?;
    println!("{} Registro excluído.", "✓".green());
    if let Some(student) = roster.student(student_id) {
        println!(
            "  progresso atual: Lição {} de {}{}",
            student.current_lesson(),
            student.total_lessons(),
            render::paragraph_suffix(student.current_paragraph()),
        );
    }
    Ok(())
}

fn cmd_history(
    services: &AppServices,
    args: SelectorArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let students = services.roster().students();
    let student = resolve_student(&students, &args.selector)?;

    println!(
        "{}  Lição {} de {}{}",
        student.name().bold(),
        student.current_lesson(),
        student.total_lessons(),
        render::paragraph_suffix(student.current_paragraph()),
    );
    if student.history().is_empty() {
        println!("  {}", "Nenhum registro ainda.".dimmed());
        return Ok(());
    }

    // Newest entries first, like the printed card the tracker replaces.
    for session in student.history().iter().rev() {
        render::print_history_entry(session);
    }
    println!(
        "  tempo total: {}",
        render::format_duration(student.total_study_minutes()),
    );
    Ok(())
}

async fn cmd_tips(
    services: &AppServices,
    args: TipsArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let students = services.roster().students();
    let student = resolve_student(&students, &args.selector)?;
    let lesson = student.current_lesson();

    println!("{}", format!("Dicas para Lição {lesson}").bold());
    let tips = services
        .tips()
        .teaching_tips(lesson, args.topic.as_deref())
        .await;
    println!();
    render::print_markdown(&tips);
    Ok(())
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn setup_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging();

    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: show the roster when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::List,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::List,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut db_url = std::env::var("STUDY_DB_URL")
        .ok()
        .map_or_else(|| "sqlite://students.sqlite3".into(), normalize_sqlite_url);

    let mut iter = argv.into_iter();
    let action = parse_action(cmd, &mut iter, &mut db_url).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&db_url)?;
    let services = AppServices::open_sqlite(&db_url, Clock::default_clock()).await;

    let outcome = match action {
        Action::List => {
            cmd_list(&services);
            Ok(())
        }
        Action::Add(args) => cmd_add(&services, args).await,
        Action::Edit(args) => cmd_edit(&services, args).await,
        Action::Remove(args) => cmd_remove(&services, args).await,
        Action::Record(args) => cmd_record(&services, args).await,
        Action::Amend(args) => cmd_amend(&services, args).await,
        Action::Forget(args) => cmd_forget(&services, args).await,
        Action::History(args) => cmd_history(&services, args),
        Action::Tips(args) => cmd_tips(&services, args).await,
    };

    services.close().await;
    outcome
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
