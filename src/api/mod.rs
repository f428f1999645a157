mod admin;
mod results;
mod survey;

pub fn routes() -> Vec<rocket::Route> {
    let mut routes = Vec::new();
    routes.extend(survey::routes());
    routes.extend(results::routes());
    routes.extend(admin::routes());
    routes
}
