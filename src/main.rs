use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use chrono::NaiveDate;
use uuid::Uuid;
use gastos_domain::{Amount, ExpenseStatus, NewExpense, Role, UserAccount};
use gastos_persistence::DieselGastosStore;
use tramite::engine::{EngineConfig, LifecycleEngine};
use tramite::stubs::InMemoryDocumentStore;
use tramite::{guard, transitions};
use tramite::{DocumentStore, ExpenseFilter, IdentityRepository, PaymentDoc, PaymentProof,
              RoleRemoval, TramiteError, TransitionOutcome, TransitionRequest};

/// Pequeño menú interactivo para tramitar gastos usando el almacén
/// proporcionado por `gastos-persistence` y un almacén de documentos en
/// memoria.
///
/// Opciones soportadas:
/// 1) Iniciar sesión (la primera cuenta de una base vacía queda como administrador)
/// 2) Ver gastos (tabla con id, estado, monto y proveedor)
/// 3) Ver detalle de un gasto (datos, bitácora y comentarios)
/// 4) Crear gasto
/// 5) Cambiar estado de un gasto
/// 6) Comentar un gasto
/// 7) Catálogo de proveedores y personas
/// 8) Usuarios y roles
/// 9) Salir
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Inicializar el almacén (aplica migraciones embebidas si procede)
    let store = Arc::new(gastos_persistence::new_store_from_env().map_err(|e| Box::new(e) as Box<dyn Error>)?);
    let docs = Arc::new(InMemoryDocumentStore::new());
    let engine = LifecycleEngine::new(store.clone(), docs.clone(), EngineConfig::default());
    log::info!("base de datos lista");

    let mut session: Option<Uuid> = None;
    let mut session_email = String::new();

    loop {
        println!("\n== Gastos CLI menu ==");
        if session.is_some() {
            println!("(sesión: {})", session_email);
        }
        println!("1) Iniciar sesión");
        println!("2) Ver gastos");
        println!("3) Ver detalle de un gasto");
        println!("4) Crear gasto");
        println!("5) Cambiar estado de un gasto");
        println!("6) Comentar un gasto");
        println!("7) Catálogo de proveedores y personas");
        println!("8) Usuarios y roles");
        println!("9) Salir");
        print!("Elige una opción: ");
        io::stdout().flush().ok();

        let mut choice = String::new();
        if io::stdin().read_line(&mut choice)? == 0 {
            break;
        }
        match choice.trim() {
            "1" => {
                let email = prompt("Correo: ")?;
                match store.lookup_by_email(email.trim()) {
                    Ok(Some(cuenta)) => {
                        println!("Sesión iniciada como {}", cuenta.email());
                        session = Some(cuenta.id());
                        session_email = cuenta.email().to_string();
                    }
                    Ok(None) => match store.list_users() {
                        Ok(usuarios) if usuarios.is_empty() => {
                            match bootstrap_admin(store.as_ref(), email.trim()) {
                                Ok(cuenta) => {
                                    println!("Base vacía: {} queda registrada como administrador", cuenta.email());
                                    session = Some(cuenta.id());
                                    session_email = cuenta.email().to_string();
                                }
                                Err(e) => eprintln!("Error registrando la cuenta inicial: {}", e),
                            }
                        }
                        Ok(_) => eprintln!("No existe la cuenta '{}'; pide a un administrador registrarla", email.trim()),
                        Err(e) => eprintln!("Error consultando usuarios: {}", e),
                    },
                    Err(e) => eprintln!("Error buscando la cuenta: {}", e),
                }
            }
            "2" => {
                let actor = match guard::authenticate(session) {
                    Ok(a) => a,
                    Err(e) => { eprintln!("{}", e); continue; }
                };
                let estado_s = prompt("Filtrar por estado (enter para todos): ")?;
                let filtro = if estado_s.trim().is_empty() {
                    ExpenseFilter::default()
                } else {
                    match ExpenseStatus::parse(estado_s.trim()) {
                        Ok(s) => ExpenseFilter::by_status(s),
                        Err(e) => { eprintln!("{}", e); continue; }
                    }
                };
                match engine.list_expenses(actor, &filtro) {
                    Ok(vistas) => {
                        println!("\nID                                   | ESTADO | MONTO | PROVEEDOR | SOLICITANTE");
                        println!("------------------------------------------------------------------------------");
                        for v in &vistas {
                            println!("{} | {} | {} | {} | {}",
                                     v.expense.id(),
                                     v.expense.status(),
                                     v.expense.amount(),
                                     v.supplier_name,
                                     v.requester_email);
                        }
                        println!("({} gasto(s))", vistas.len());
                    }
                    Err(e) => eprintln!("Error listando gastos: {}", e),
                }
            }
            "3" => {
                let actor = match guard::authenticate(session) {
                    Ok(a) => a,
                    Err(e) => { eprintln!("{}", e); continue; }
                };
                let id_s = prompt("Gasto id (UUID): ")?;
                let id = match Uuid::parse_str(id_s.trim()) {
                    Ok(u) => u,
                    Err(_) => { eprintln!("UUID inválido"); continue; }
                };
                match engine.get_expense(actor, id) {
                    Ok(vista) => {
                        let g = &vista.expense;
                        println!("\nGasto {}", g.id());
                        println!("Estado: {} | Monto: {} | Categoría: {}", g.status(), g.amount(), g.category());
                        println!("Proveedor: {} | Solicitante: {}", vista.supplier_name, vista.requester_email);
                        if let Some(d) = g.description() {
                            println!("Descripción: {}", d);
                        }
                        if g.reimbursement() {
                            let persona = g.reimbursement_person().map(|p| p.to_string()).unwrap_or_else(|| "-".into());
                            println!("Reembolso a: {}", persona);
                        }
                        println!("Respaldo: {}", g.supporting_doc_key());
                        if let Some(clave) = g.payment_doc_key() {
                            let fecha = g.payment_date().map(|f| f.to_string()).unwrap_or_else(|| "-".into());
                            println!("Comprobante: {} | Fecha de pago: {}", clave, fecha);
                            match engine.document_url(actor, clave) {
                                Ok(Some(url)) => println!("URL temporal: {}", url),
                                Ok(None) => {}
                                Err(e) => eprintln!("Error firmando URL: {}", e),
                            }
                        }
                        match engine.list_log(actor, id) {
                            Ok(bitacora) => {
                                println!("\nBitácora:");
                                for l in bitacora {
                                    println!("{} | {} | {}", l.created_at.format("%Y-%m-%d %H:%M"), l.actor_email, l.message);
                                }
                            }
                            Err(e) => eprintln!("Error leyendo la bitácora: {}", e),
                        }
                        match engine.list_comments(actor, id) {
                            Ok(comentarios) => {
                                println!("\nComentarios:");
                                for c in comentarios {
                                    println!("{} | {} | {}", c.created_at.format("%Y-%m-%d %H:%M"), c.author_email, c.text);
                                }
                            }
                            Err(e) => eprintln!("Error leyendo comentarios: {}", e),
                        }
                    }
                    Err(e) => eprintln!("Error consultando el gasto: {}", e),
                }
            }
            "4" => {
                let actor = match guard::authenticate(session) {
                    Ok(a) => a,
                    Err(e) => { eprintln!("{}", e); continue; }
                };
                match engine.list_suppliers(actor) {
                    Ok(lista) if lista.is_empty() => {
                        eprintln!("No hay proveedores; registra uno con la opción 7");
                        continue;
                    }
                    Ok(lista) => {
                        println!("Proveedores:");
                        for p in &lista {
                            println!("{} | {}", p.id(), p.name());
                        }
                    }
                    Err(e) => { eprintln!("Error listando proveedores: {}", e); continue; }
                }
                let proveedor_s = prompt("Proveedor id (UUID): ")?;
                let supplier_id = match Uuid::parse_str(proveedor_s.trim()) {
                    Ok(u) => u,
                    Err(_) => { eprintln!("UUID inválido"); continue; }
                };
                let monto_s = prompt("Monto (ej: 1234.56): ")?;
                let amount = match Amount::parse(monto_s.trim()) {
                    Ok(a) => a,
                    Err(e) => { eprintln!("Monto inválido: {}", e); continue; }
                };
                let categoria = prompt("Categoría: ")?;
                let descripcion = prompt("Descripción (enter para omitir): ")?;
                let descripcion_opt = if descripcion.trim().is_empty() { None } else { Some(descripcion.trim().to_string()) };
                let respaldo = prompt("Clave del documento de respaldo (ej: quotes/q-1.pdf): ")?;
                // La demo sube contenido fijo al almacén en memoria.
                if let Err(e) = docs.upload(respaldo.trim(), b"contenido de demostracion") {
                    eprintln!("Error subiendo el respaldo: {}", e);
                    continue;
                }
                let reembolso_s = prompt("¿Es reembolso? escribir 'si' si aplica: ")?;
                let reimbursement = reembolso_s.trim().to_lowercase() == "si";
                let persona_opt = if reimbursement {
                    let persona = prompt("Persona a reembolsar: ")?;
                    if persona.trim().is_empty() { None } else { Some(persona.trim().to_string()) }
                } else {
                    None
                };
                match engine.find_similar(actor, supplier_id, amount) {
                    Ok(parecidos) if !parecidos.is_empty() => {
                        println!("Aviso: ya hay {} gasto(s) con el mismo proveedor y monto:", parecidos.len());
                        for p in &parecidos {
                            println!("{} | {} | {}", p.id(), p.status(), p.created_at().format("%Y-%m-%d"));
                        }
                        let confirm = prompt("¿Crear de todos modos? escribir 'si' para confirmar: ")?;
                        if confirm.trim().to_lowercase() != "si" {
                            println!("Creación cancelada");
                            continue;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => { eprintln!("Error buscando duplicados: {}", e); continue; }
                }
                let datos = NewExpense {
                    supplier_id,
                    amount,
                    category: categoria.trim().to_string(),
                    description: descripcion_opt,
                    supporting_doc_key: respaldo.trim().to_string(),
                    reimbursement,
                    reimbursement_person: persona_opt,
                };
                match engine.create_expense(actor, datos) {
                    Ok(gasto) => println!("Gasto creado: {}", gasto.id()),
                    Err(e) => eprintln!("Error creando el gasto: {}", e),
                }
            }
            "5" => {
                let actor = match guard::authenticate(session) {
                    Ok(a) => a,
                    Err(e) => { eprintln!("{}", e); continue; }
                };
                let id_s = prompt("Gasto id (UUID): ")?;
                let id = match Uuid::parse_str(id_s.trim()) {
                    Ok(u) => u,
                    Err(_) => { eprintln!("UUID inválido"); continue; }
                };
                let roles = match engine.my_roles(actor) {
                    Ok(r) => r,
                    Err(e) => { eprintln!("Error consultando roles: {}", e); continue; }
                };
                let destinos = transitions::allowed_targets(&roles);
                if destinos.is_empty() {
                    eprintln!("Tus roles no permiten cambiar estados");
                    continue;
                }
                let etiquetas: Vec<&str> = destinos.iter().map(|s| s.as_str()).collect();
                let destino_s = prompt(&format!("Estado destino ({}): ", etiquetas.join(", ")))?;
                let destino = match transitions::parse_target(destino_s.trim()) {
                    Ok(s) => s,
                    Err(e) => { eprintln!("{}", e); continue; }
                };
                let comentario = prompt("Comentario (enter para omitir): ")?;
                let comentario_opt = if comentario.trim().is_empty() { None } else { Some(comentario.trim().to_string()) };
                let pago_opt = if destino == ExpenseStatus::Pagado {
                    let clave = prompt("Clave del comprobante (enter para reutilizar el respaldo): ")?;
                    let doc = if clave.trim().is_empty() {
                        PaymentDoc::ReuseSupporting
                    } else {
                        PaymentDoc::Key(clave.trim().to_string())
                    };
                    if let PaymentDoc::Key(ref k) = doc {
                        if let Err(e) = docs.upload(k, b"comprobante de demostracion") {
                            eprintln!("Error subiendo el comprobante: {}", e);
                            continue;
                        }
                    }
                    let fecha_s = prompt("Fecha de pago AAAA-MM-DD (enter para hoy): ")?;
                    let fecha = if fecha_s.trim().is_empty() {
                        None
                    } else {
                        match NaiveDate::parse_from_str(fecha_s.trim(), "%Y-%m-%d") {
                            Ok(f) => Some(f),
                            Err(_) => { eprintln!("Fecha inválida"); continue; }
                        }
                    };
                    Some(PaymentProof { doc: Some(doc), date: fecha })
                } else {
                    None
                };
                match engine.transition(id, actor, destino, TransitionRequest { comment: comentario_opt, payment: pago_opt }) {
                    Ok(TransitionOutcome::Applied(gasto)) => println!("Estado actualizado: {}", gasto.status()),
                    Ok(TransitionOutcome::CommentOnly) => println!("El estado no cambió; comentario registrado"),
                    Ok(TransitionOutcome::NothingToSave) => println!("Nada que guardar"),
                    Err(e) => eprintln!("Error en la transición: {}", e),
                }
            }
            "6" => {
                let actor = match guard::authenticate(session) {
                    Ok(a) => a,
                    Err(e) => { eprintln!("{}", e); continue; }
                };
                let id_s = prompt("Gasto id (UUID): ")?;
                let id = match Uuid::parse_str(id_s.trim()) {
                    Ok(u) => u,
                    Err(_) => { eprintln!("UUID inválido"); continue; }
                };
                let texto = prompt("Comentario: ")?;
                match engine.add_comment(id, actor, texto.trim()) {
                    Ok(c) => println!("Comentario registrado: {}", c.id),
                    Err(e) => eprintln!("Error comentando: {}", e),
                }
            }
            "7" => {
                let actor = match guard::authenticate(session) {
                    Ok(a) => a,
                    Err(e) => { eprintln!("{}", e); continue; }
                };
                let sub = prompt("a) ver proveedores, b) crear proveedor, c) ver personas, d) crear persona: ")?;
                match sub.trim() {
                    "a" => match engine.list_suppliers(actor) {
                        Ok(lista) => {
                            for p in &lista {
                                println!("{} | {}", p.id(), p.name());
                            }
                            println!("({} proveedor(es))", lista.len());
                        }
                        Err(e) => eprintln!("Error listando proveedores: {}", e),
                    },
                    "b" => {
                        let nombre = prompt("Nombre del proveedor: ")?;
                        match engine.create_supplier(actor, nombre.trim()) {
                            Ok(p) => println!("Proveedor creado: {}", p.id()),
                            Err(e) => eprintln!("Error creando proveedor: {}", e),
                        }
                    }
                    "c" => match engine.list_people(actor) {
                        Ok(lista) => {
                            for p in &lista {
                                println!("{} | {}", p.id(), p.name());
                            }
                            println!("({} persona(s))", lista.len());
                        }
                        Err(e) => eprintln!("Error listando personas: {}", e),
                    },
                    "d" => {
                        let nombre = prompt("Nombre de la persona: ")?;
                        match engine.create_person(actor, nombre.trim()) {
                            Ok(p) => println!("Persona creada: {}", p.id()),
                            Err(e) => eprintln!("Error creando persona: {}", e),
                        }
                    }
                    other => println!("Opción inválida: {}", other),
                }
            }
            "8" => {
                let actor = match guard::authenticate(session) {
                    Ok(a) => a,
                    Err(e) => { eprintln!("{}", e); continue; }
                };
                let sub = prompt("a) ver usuarios, b) registrar usuario, c) asignar rol, d) quitar rol: ")?;
                match sub.trim() {
                    "a" => match engine.users_with_roles(actor) {
                        Ok(lista) => {
                            for (cuenta, roles) in &lista {
                                let etiquetas: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
                                println!("{} | {} | [{}]", cuenta.id(), cuenta.email(), etiquetas.join(", "));
                            }
                            println!("({} usuario(s))", lista.len());
                        }
                        Err(e) => eprintln!("Error listando usuarios: {}", e),
                    },
                    "b" => {
                        let email = prompt("Correo del nuevo usuario: ")?;
                        match engine.register_user(actor, email.trim()) {
                            Ok(cuenta) => println!("Usuario registrado: {} ({})", cuenta.email(), cuenta.id()),
                            Err(e) => eprintln!("Error registrando usuario: {}", e),
                        }
                    }
                    "c" | "d" => {
                        let id_s = prompt("Usuario id (UUID): ")?;
                        let target = match Uuid::parse_str(id_s.trim()) {
                            Ok(u) => u,
                            Err(_) => { eprintln!("UUID inválido"); continue; }
                        };
                        let etiquetas: Vec<&str> = Role::ALL.iter().map(|r| r.as_str()).collect();
                        let rol_s = prompt(&format!("Rol ({}): ", etiquetas.join(", ")))?;
                        let rol = match Role::parse(rol_s.trim()) {
                            Ok(r) => r,
                            Err(e) => { eprintln!("{}", e); continue; }
                        };
                        if sub.trim() == "c" {
                            match engine.assign_role(actor, target, rol) {
                                Ok(()) => println!("Rol asignado"),
                                Err(e) => eprintln!("Error asignando rol: {}", e),
                            }
                        } else {
                            match engine.remove_role(actor, target, rol) {
                                Ok(RoleRemoval::Removed) => println!("Rol eliminado"),
                                Ok(RoleRemoval::SelfAdminIgnored) => println!("Ignorado: no puedes quitarte el rol 'administrador'"),
                                Err(e) => eprintln!("Error quitando rol: {}", e),
                            }
                        }
                    }
                    other => println!("Opción inválida: {}", other),
                }
            }
            "9" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    Ok(())
}

/// Registra la primera cuenta de una base vacía y le asigna el rol
/// `administrador` directamente sobre el almacén.
fn bootstrap_admin(store: &DieselGastosStore, email: &str) -> Result<UserAccount, TramiteError> {
    let cuenta = UserAccount::new(email)?;
    store.register_user(&cuenta)?;
    store.assign_role(&cuenta.id(), Role::Administrador)?;
    Ok(cuenta)
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
