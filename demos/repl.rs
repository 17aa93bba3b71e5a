use dabble::ast::{Function, Value};
use dabble::evaluator::create_standard_env;
use dabble::loader::load_library;
use dabble::parser::parse_all;
use dabble::{Environment, Error, EvalConfig, Interpreter};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::{Path, PathBuf};
use std::{env, panic, process};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let lib_dir = match parse_args(env::args().skip(1)) {
        Ok(lib_dir) => lib_dir,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("Usage: repl [--lib DIR]");
            process::exit(2);
        }
    };

    let result = panic::catch_unwind(|| {
        run_repl(lib_dir.as_deref());
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<PathBuf>, String> {
    let mut lib_dir = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--lib" => match args.next() {
                Some(dir) => lib_dir = Some(PathBuf::from(dir)),
                None => return Err("--lib needs a directory".into()),
            },
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(lib_dir)
}

fn load_into(env: &Environment, dir: &Path) -> Result<Environment, Error> {
    let library = load_library(dir, env)?;
    println!("Loaded {} definition(s) from {}", library.len(), dir.display());
    Ok(env.extend_all(&library))
}

fn run_repl(lib_dir: Option<&Path>) {
    println!("Dabble - a small Lisp with quasiquote-style macros");
    println!("Enter S-expressions like: (cons 1 '(2 3))");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let mut env = create_standard_env();
    if let Some(dir) = lib_dir {
        match load_into(&env, dir) {
            Ok(extended) => env = extended,
            Err(e) => println!("{}", Value::from(e)),
        }
    }

    let mut interpreter = Interpreter::with_config(EvalConfig::bounded());

    loop {
        match rl.readline("dabble> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
                    (":help", _) => {
                        print_help();
                        continue;
                    }
                    (":env", "all") => {
                        // Head first, shadowed bindings included
                        println!("{}", env.to_alist());
                        continue;
                    }
                    (":env", _) => {
                        print_environment(&env);
                        continue;
                    }
                    (":trace", _) => {
                        let mut config = *interpreter.config();
                        config.trace = !config.trace;
                        interpreter.set_config(config);
                        println!("Tracing {}", if config.trace { "on" } else { "off" });
                        continue;
                    }
                    (":load", "") => {
                        println!("Usage: :load DIR");
                        continue;
                    }
                    (":load", dir) => {
                        match load_into(&env, Path::new(dir)) {
                            Ok(extended) => env = extended,
                            Err(e) => println!("{}", Value::from(e)),
                        }
                        continue;
                    }
                    (":quit" | ":exit", _) => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                let forms = match parse_all(line) {
                    Ok(forms) => forms,
                    Err(e) => {
                        println!("{}", Value::from(e));
                        continue;
                    }
                };

                for form in &forms {
                    let result = interpreter.eval_to_value(form, &env);
                    if let Some(trace) = interpreter.take_trace()
                        && !trace.is_empty()
                    {
                        println!("{trace}");
                    }
                    println!("{result}");
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help() {
    println!("Dabble REPL commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :env all   - Print the whole binding chain as an alist");
    println!("  :trace     - Toggle printing of the evaluation trace");
    println!("  :load DIR  - Load every .lisp file under DIR");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Primitives:");
    println!("  quote unquote atom car cdr cons eq if label lambda macro apply error recur");
    println!("  Arithmetic: +, -, *, <, >");
    println!();
    println!("Examples:");
    println!("  (car '(1 2 3))");
    println!("  ((lambda (a b) (cons a b)) 1 '(2))");
    println!("  ((macro (x y) '(`y `x)) 1 2)");
    println!("  ((lambda (n) (if (eq n 0) () (cons n (recur (- n 1))))) 3)");
    println!();
}

fn print_environment(env: &Environment) {
    let bindings = env.get_all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    // Separate primitives from everything else
    let mut builtins = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Value::Function(Function::Builtin(_) | Function::Host(_)) => builtins.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !builtins.is_empty() {
        println!("Built-in functions ({}):", builtins.len());
        // Print in columns for readability
        let mut col = 0;
        for name in builtins {
            print!("  {name:<15}");
            col += 1;
            if col % 4 == 0 {
                println!();
            }
        }
        if col % 4 != 0 {
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("Other values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
