use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use serde_json::json;
use std::io::{self, BufRead};
use taskflow_cli::cli::output::{self, print_json};
use taskflow_cli::cli::{
    AiCommand, AttachCommand, Cli, Command, CommentCommand, DepCommand, FolderCommand,
    GanttCommand, ListCommand, NotificationsCommand, SubtaskCommand, TaskCommand,
    TemplateCommand, UserCommand, WorkspaceCommand, parse_config_overrides,
};
use taskflow_core::ai::{AiService, AssistantReply, GeminiClient};
use taskflow_core::board::{NewTask, TaskPatch};
use taskflow_core::config::{Config, load_config_with_fallback, merge_overrides};
use taskflow_core::error::AppError;
use taskflow_core::gantt;
use taskflow_core::permissions::permissions_for;
use taskflow_core::reorder::DropTarget;
use taskflow_core::storage::json_store;
use taskflow_core::task_api::TaskApi;
use taskflow_core::{dates, views};
use tracing::warn;
use tracing_subscriber::EnvFilter;

struct Context {
    api: TaskApi,
    config: Config,
    json: bool,
}

impl Context {
    fn ai(&self) -> Result<AiService<GeminiClient>, AppError> {
        Ok(AiService::new(GeminiClient::new(&self.config.ai)?))
    }

    /// Maps a user query (id, name or email) to a user id.
    fn user_id(&self, query: &str) -> Result<String, AppError> {
        Ok(self.api.snapshot()?.find_user(query)?.id.clone())
    }

    fn drop_target(&self, id: &str) -> Result<DropTarget, AppError> {
        let board = self.api.snapshot()?;
        if let Ok(folder) = board.folder(id) {
            return Ok(DropTarget::Folder(folder.id.clone()));
        }
        if let Ok(list) = board.list(id) {
            return Ok(DropTarget::List(list.id.clone()));
        }
        Err(AppError::not_found(format!("drop target not found: {id}")))
    }
}

fn init_tracing() {
    // WARN by default; TASKFLOW_LOG wins over RUST_LOG.
    let filter = std::env::var("TASKFLOW_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn build_context(cli: &Cli) -> Result<Context, AppError> {
    let overrides = parse_config_overrides(&cli.config_override)?;
    let load = load_config_with_fallback();
    if let Some(err) = load.error.as_ref() {
        warn!(error = %err, "config unreadable; using defaults");
    }
    let config = merge_overrides(&load.config, &overrides);

    let path = json_store::store_path()?;
    let actor = match cli
        .acting_user
        .as_deref()
        .or(config.current_user.as_deref())
    {
        Some(query) => {
            let board = json_store::load_board(&path)?;
            let user = board
                .find_user(query)
                .map_err(|_| AppError::not_found(format!("acting user not found: {query}")))?;
            Some(user.id.clone())
        }
        None => None,
    };

    Ok(Context {
        api: TaskApi::with_path(path, actor.as_deref()),
        config,
        json: cli.json,
    })
}

fn run_command(cli: Cli) -> Result<(), AppError> {
    let ctx = build_context(&cli)?;
    match cli.command {
        Command::Workspace(cmd) => run_workspace(&ctx, cmd),
        Command::Folder(cmd) => run_folder(&ctx, cmd),
        Command::List(cmd) => run_list(&ctx, cmd),
        Command::Task(cmd) => run_task(&ctx, cmd),
        Command::Subtask(cmd) => run_subtask(&ctx, cmd),
        Command::Comment(cmd) => run_comment(&ctx, cmd),
        Command::Attach(cmd) => run_attach(&ctx, cmd),
        Command::Dep(cmd) => run_dep(&ctx, cmd),
        Command::User(cmd) => run_user(&ctx, cmd),
        Command::Template(cmd) => run_template(&ctx, cmd),
        Command::Notifications(cmd) => run_notifications(&ctx, cmd),
        Command::Notify => run_notify(&ctx),
        Command::Tasks { filter } => {
            let board = ctx.api.snapshot()?;
            let tasks = views::filter_tasks(&board, &filter.to_filter())?;
            if ctx.json {
                print_json(&tasks)
            } else {
                println!("{}", output::task_table(&board, &tasks));
                Ok(())
            }
        }
        Command::Board { filter } => {
            let board = ctx.api.snapshot()?;
            let columns = views::board_columns(&board, &filter.to_filter())?;
            if ctx.json {
                print_json(&output::board_json(&columns))
            } else {
                print!("{}", output::board_view(&board, &columns));
                Ok(())
            }
        }
        Command::Calendar { month, filter } => {
            let (year, month) = match month.as_deref() {
                Some(raw) => views::parse_month(raw)?,
                None => {
                    let today = dates::local_today();
                    (today.year(), today.month())
                }
            };
            let board = ctx.api.snapshot()?;
            let calendar = views::calendar_month(&board, year, month, &filter.to_filter())?;
            if ctx.json {
                print_json(&output::calendar_json(&calendar))
            } else {
                print!("{}", output::calendar_view(&calendar));
                Ok(())
            }
        }
        Command::Gantt(cmd) => run_gantt(&ctx, cmd),
        Command::Sidebar => {
            let board = ctx.api.snapshot()?;
            let tree = views::sidebar_tree(&board);
            if ctx.json {
                print_json(&output::sidebar_json(&tree))
            } else {
                print!("{}", output::sidebar_view(&tree));
                Ok(())
            }
        }
        Command::Ai(cmd) => run_ai(&ctx, cmd),
    }
}

fn run_workspace(ctx: &Context, cmd: WorkspaceCommand) -> Result<(), AppError> {
    let (verb, workspace) = match cmd {
        WorkspaceCommand::Add { name } => ("Added", ctx.api.create_workspace(&name)?),
        WorkspaceCommand::Rename { id, name } => ("Renamed", ctx.api.rename_workspace(&id, &name)?),
        WorkspaceCommand::Delete { id } => ("Deleted", ctx.api.delete_workspace(&id)?),
        WorkspaceCommand::List => {
            let board = ctx.api.snapshot()?;
            let mut workspaces: Vec<_> = board.workspaces.iter().collect();
            workspaces.sort_by_key(|w| w.order);
            if ctx.json {
                return print_json(&workspaces);
            }
            println!("{}", output::workspace_table(&workspaces));
            return Ok(());
        }
    };
    if ctx.json {
        return print_json(&workspace);
    }
    println!("{verb} workspace: {} ({})", workspace.name, workspace.id);
    Ok(())
}

fn run_folder(ctx: &Context, cmd: FolderCommand) -> Result<(), AppError> {
    let (verb, folder) = match cmd {
        FolderCommand::Add { workspace, name } => {
            ("Added", ctx.api.create_folder(&workspace, &name)?)
        }
        FolderCommand::Rename { id, name } => ("Renamed", ctx.api.rename_folder(&id, &name)?),
        FolderCommand::Delete { id } => ("Deleted", ctx.api.delete_folder(&id)?),
        FolderCommand::Move { id, target, zone } => {
            let target = ctx.drop_target(&target)?;
            ("Moved", ctx.api.move_folder(&id, &target, zone.into())?)
        }
    };
    if ctx.json {
        return print_json(&folder);
    }
    println!("{verb} folder: {} ({})", folder.name, folder.id);
    Ok(())
}

fn run_list(ctx: &Context, cmd: ListCommand) -> Result<(), AppError> {
    let (verb, list) = match cmd {
        ListCommand::Add {
            workspace,
            name,
            folder,
        } => (
            "Added",
            ctx.api.create_list(&workspace, folder.as_deref(), &name)?,
        ),
        ListCommand::Rename { id, name } => ("Renamed", ctx.api.rename_list(&id, &name)?),
        ListCommand::Delete { id } => ("Deleted", ctx.api.delete_list(&id)?),
        ListCommand::Move { id, target, zone } => {
            let target = ctx.drop_target(&target)?;
            ("Moved", ctx.api.move_list(&id, &target, zone.into())?)
        }
    };
    if ctx.json {
        return print_json(&list);
    }
    println!("{verb} list: {} ({})", list.name, list.id);
    Ok(())
}

fn run_task(ctx: &Context, cmd: TaskCommand) -> Result<(), AppError> {
    let (verb, task) = match cmd {
        TaskCommand::Add {
            title,
            list,
            description,
            status,
            priority,
            assignee,
            start,
            due,
            subtasks,
        } => {
            let assignee_id = assignee.as_deref().map(|q| ctx.user_id(q)).transpose()?;
            let new = NewTask {
                title,
                list_id: list,
                description,
                status,
                priority: priority.unwrap_or_default(),
                assignee_id,
                start_date: start,
                due_date: due,
                subtasks,
            };
            ("Added", ctx.api.create_task(new)?)
        }
        TaskCommand::Show { id } => {
            let board = ctx.api.snapshot()?;
            let task = board.task(&id)?;
            if ctx.json {
                return print_json(task);
            }
            print!("{}", output::task_detail(&board, task)?);
            return Ok(());
        }
        TaskCommand::Edit {
            id,
            title,
            description,
            priority,
            start,
            due,
            clear_start,
            clear_due,
        } => {
            let patch = TaskPatch {
                title,
                description,
                priority,
                start_date: if clear_start { Some(None) } else { start.map(Some) },
                due_date: if clear_due { Some(None) } else { due.map(Some) },
                assignee_id: None,
            };
            ("Updated", ctx.api.update_task(&id, patch)?)
        }
        TaskCommand::Status { id, status } => ("Updated", ctx.api.set_status(&id, status)?),
        TaskCommand::Assign { id, user } => ("Updated", ctx.api.assign_task(&id, user.as_deref())?),
        TaskCommand::Move { id, list } => ("Moved", ctx.api.move_task(&id, &list)?),
        TaskCommand::Delete { id } => ("Deleted", ctx.api.delete_task(&id)?),
    };
    if ctx.json {
        return print_json(&task);
    }
    println!("{verb} task: {} ({})", task.title, task.id);
    Ok(())
}

fn run_subtask(ctx: &Context, cmd: SubtaskCommand) -> Result<(), AppError> {
    let (verb, subtask) = match cmd {
        SubtaskCommand::Add { task, title } => ("Added", ctx.api.add_subtask(&task, &title)?),
        SubtaskCommand::Toggle { task, subtask } => {
            ("Toggled", ctx.api.toggle_subtask(&task, &subtask)?)
        }
        SubtaskCommand::Remove { task, subtask } => {
            ("Removed", ctx.api.remove_subtask(&task, &subtask)?)
        }
    };
    if ctx.json {
        return print_json(&subtask);
    }
    let mark = if subtask.completed { "x" } else { " " };
    println!("{verb} subtask: [{mark}] {} ({})", subtask.title, subtask.id);
    Ok(())
}

fn run_comment(ctx: &Context, cmd: CommentCommand) -> Result<(), AppError> {
    match cmd {
        CommentCommand::Add {
            task,
            body,
            reply_to,
        } => {
            let comment = ctx.api.add_comment(&task, &body, reply_to.as_deref())?;
            if ctx.json {
                return print_json(&comment);
            }
            println!("Added comment: {}", comment.id);
        }
        CommentCommand::Delete { task, comment } => {
            let removed = ctx.api.delete_comment(&task, &comment)?;
            if ctx.json {
                return print_json(&removed);
            }
            println!("Deleted {} comment(s)", removed.len());
        }
        CommentCommand::Thread { task } => {
            let board = ctx.api.snapshot()?;
            let thread = board.comment_thread(&task)?;
            if ctx.json {
                return print_json(&output::comment_thread_json(&thread));
            }
            print!("{}", output::comment_thread(&board, &thread));
        }
    }
    Ok(())
}

fn run_attach(ctx: &Context, cmd: AttachCommand) -> Result<(), AppError> {
    let (verb, attachment) = match cmd {
        AttachCommand::Add {
            task,
            name,
            url,
            size,
        } => ("Attached", ctx.api.add_attachment(&task, &name, &url, size)?),
        AttachCommand::Remove { task, attachment } => {
            ("Removed", ctx.api.remove_attachment(&task, &attachment)?)
        }
    };
    if ctx.json {
        return print_json(&attachment);
    }
    println!("{verb}: {} ({})", attachment.name, attachment.id);
    Ok(())
}

fn run_dep(ctx: &Context, cmd: DepCommand) -> Result<(), AppError> {
    let task = match cmd {
        DepCommand::Add { task, on } => ctx.api.add_dependency(&task, &on)?,
        DepCommand::Remove { task, on } => ctx.api.remove_dependency(&task, &on)?,
    };
    if ctx.json {
        return print_json(&task);
    }
    let deps = if task.dependencies.is_empty() {
        "nothing".to_string()
    } else {
        task.dependencies.join(", ")
    };
    println!("{} ({}) depends on {deps}", task.title, task.id);
    Ok(())
}

fn run_user(ctx: &Context, cmd: UserCommand) -> Result<(), AppError> {
    let (verb, user) = match cmd {
        UserCommand::Add { name, email, role } => ("Added", ctx.api.add_user(&name, &email, role)?),
        UserCommand::Edit { id, name, email } => (
            "Updated",
            ctx.api.update_user(&id, name.as_deref(), email.as_deref())?,
        ),
        UserCommand::Role { id, role } => ("Updated", ctx.api.set_role(&id, role)?),
        UserCommand::Delete { id } => ("Deleted", ctx.api.delete_user(&id)?),
        UserCommand::List => {
            let board = ctx.api.snapshot()?;
            if ctx.json {
                return print_json(&board.users);
            }
            println!("{}", output::user_table(&board.users));
            return Ok(());
        }
        UserCommand::Whoami => {
            let user = ctx.api.whoami()?;
            let permissions: Vec<&str> = match user.as_ref() {
                Some(user) => permissions_for(user.role).iter().map(|p| p.as_str()).collect(),
                None => vec!["*"],
            };
            if ctx.json {
                return print_json(&json!({ "user": user, "permissions": permissions }));
            }
            match user {
                Some(user) => println!("{} <{}> {}", user.name, user.email, user.role.as_str()),
                None => println!("(no acting user: unrestricted)"),
            }
            println!("permissions: {}", permissions.join(", "));
            return Ok(());
        }
    };
    if ctx.json {
        return print_json(&user);
    }
    println!("{verb} user: {} <{}> {} ({})", user.name, user.email, user.role.as_str(), user.id);
    Ok(())
}

fn run_template(ctx: &Context, cmd: TemplateCommand) -> Result<(), AppError> {
    match cmd {
        TemplateCommand::Save { task, name } => {
            let template = ctx.api.save_template(&task, &name)?;
            if ctx.json {
                return print_json(&template);
            }
            println!("Saved template: {} ({})", template.name, template.id);
        }
        TemplateCommand::Use { template, list } => {
            let task = ctx.api.create_from_template(&template, &list)?;
            if ctx.json {
                return print_json(&task);
            }
            println!("Added task: {} ({})", task.title, task.id);
        }
        TemplateCommand::Delete { id } => {
            let template = ctx.api.delete_template(&id)?;
            if ctx.json {
                return print_json(&template);
            }
            println!("Deleted template: {} ({})", template.name, template.id);
        }
        TemplateCommand::List => {
            let board = ctx.api.snapshot()?;
            if ctx.json {
                return print_json(&board.templates);
            }
            println!("{}", output::template_table(&board.templates));
        }
    }
    Ok(())
}

fn run_notifications(ctx: &Context, cmd: NotificationsCommand) -> Result<(), AppError> {
    match cmd {
        NotificationsCommand::List { unread } => {
            let notifications = ctx.api.notifications(unread)?;
            if ctx.json {
                return print_json(&notifications);
            }
            println!("{}", output::notification_table(&notifications));
        }
        NotificationsCommand::Read { id } => {
            let notification = ctx.api.mark_read(&id)?;
            if ctx.json {
                return print_json(&notification);
            }
            println!("Marked read: {}", notification.id);
        }
        NotificationsCommand::ReadAll => {
            let count = ctx.api.mark_all_read()?;
            if ctx.json {
                return print_json(&json!({ "marked": count }));
            }
            println!("Marked {count} notification(s) read");
        }
        NotificationsCommand::Clear => {
            let count = ctx.api.clear_notifications()?;
            if ctx.json {
                return print_json(&json!({ "cleared": count }));
            }
            println!("Cleared {count} notification(s)");
        }
    }
    Ok(())
}

fn run_notify(ctx: &Context) -> Result<(), AppError> {
    let outcome = ctx.api.notify_pending()?;
    if ctx.json {
        let failures: Vec<_> = outcome
            .failures
            .iter()
            .map(|(id, err)| json!({ "task_id": id, "error": err.to_string() }))
            .collect();
        print_json(&json!({ "sent": outcome.sent, "failures": failures }))?;
    } else {
        for id in &outcome.sent {
            println!("Notified: {id}");
        }
        for (id, err) in &outcome.failures {
            eprintln!("ERROR: {id}: {err}");
        }
    }
    match outcome.failures.into_iter().next() {
        Some((_, err)) if outcome.sent.is_empty() => Err(err),
        _ => Ok(()),
    }
}

fn run_gantt(ctx: &Context, cmd: GanttCommand) -> Result<(), AppError> {
    let config = ctx.config.gantt_config();
    match cmd {
        GanttCommand::Show { filter, svg } => {
            let board = ctx.api.snapshot()?;
            let tasks = views::filter_tasks(&board, &filter.to_filter())?;
            let layout = gantt::layout(tasks, config, dates::local_offset())?;
            if svg {
                print!("{}", gantt::render_svg(&layout));
            } else if ctx.json {
                print_json(&output::gantt_json(&layout))?;
            } else if layout.bars.is_empty() {
                println!("(no tasks)");
            } else {
                print!("{}", gantt::render_ascii(&layout));
            }
        }
        GanttCommand::Drag { id, delta_px, mode } => {
            let task = ctx.api.apply_drag(&id, mode.into(), delta_px, &config)?;
            if ctx.json {
                return print_json(&task);
            }
            println!(
                "Rescheduled task: {} ({}) {} .. {}",
                task.title,
                task.id,
                task.start_date.as_deref().unwrap_or("-"),
                task.due_date.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

fn print_lines(json: bool, lines: &[String], empty: &str) -> Result<(), AppError> {
    if json {
        return print_json(lines);
    }
    if lines.is_empty() {
        println!("{empty}");
    }
    for line in lines {
        println!("- {line}");
    }
    Ok(())
}

fn run_ai(ctx: &Context, cmd: AiCommand) -> Result<(), AppError> {
    let ai = ctx.ai()?;
    match cmd {
        AiCommand::Subtasks { task, save } => {
            let drafted = ctx.api.draft_subtasks(&ai, &task, save)?;
            print_lines(ctx.json, &drafted, "(no suggestions)")?;
        }
        AiCommand::Describe { task, save } => {
            let drafted = ctx.api.draft_description(&ai, &task, save)?;
            if ctx.json {
                return print_json(&json!({ "description": drafted }));
            }
            println!("{}", if drafted.is_empty() { "(no suggestion)" } else { drafted.as_str() });
        }
        AiCommand::Summary { filter } => {
            let summary = ctx.api.project_summary(&ai, &filter.to_filter())?;
            if ctx.json {
                return print_json(&json!({ "summary": summary }));
            }
            println!("{}", if summary.is_empty() { "(no summary)" } else { summary.as_str() });
        }
        AiCommand::Risks { filter } => {
            let risks = ctx
                .api
                .risk_analysis(&ai, &filter.to_filter(), dates::local_today())?;
            if ctx.json {
                return print_json(&risks);
            }
            if risks.is_empty() {
                println!("(no risks found)");
            }
            for risk in &risks {
                println!("{:?} {}: {}", risk.level, risk.task_id, risk.reason);
            }
        }
        AiCommand::Replies { task } => {
            let replies = ctx.api.suggest_replies(&ai, &task)?;
            print_lines(ctx.json, &replies, "(no suggestions)")?;
        }
        AiCommand::Chat { message, list } => {
            let outcome = ctx.api.assistant(&ai, &message, list.as_deref())?;
            match (&outcome.reply, &outcome.task) {
                (AssistantReply::Message(text), _) => {
                    if ctx.json {
                        return print_json(&json!({ "message": text }));
                    }
                    println!("{text}");
                }
                (AssistantReply::Action(action), task) => {
                    if ctx.json {
                        return print_json(&json!({ "action": action.describe(), "task": task }));
                    }
                    match task {
                        Some(task) => println!("Done: {} ({})", action.describe(), task.id),
                        None => println!("Done: {}", action.describe()),
                    }
                }
            }
        }
    }
    Ok(())
}

fn run_interactive() -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("taskflow".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(cli) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    init_tracing();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::split_command_line;

    #[test]
    fn split_command_line_respects_quotes() {
        let args = split_command_line(r#"task add "Write \"docs\"" --list list-1"#).unwrap();
        assert_eq!(args, vec!["task", "add", "Write \"docs\"", "--list", "list-1"]);
    }

    #[test]
    fn split_command_line_rejects_unterminated_quote() {
        let err = split_command_line(r#"task add "oops"#).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }
}
